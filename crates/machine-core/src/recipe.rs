//! Recipe carrier used to build instances from scratch

use serde::{Deserialize, Serialize};

/// A typed, backend-specific description of how to build an instance.
///
/// Opaque to this crate beyond its `kind`, which providers use for
/// dispatch; the script content is forwarded to the backend verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    kind: String,
    script: String,
}

impl Recipe {
    pub fn new(kind: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            script: script.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}
