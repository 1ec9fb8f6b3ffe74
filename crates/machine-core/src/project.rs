//! Project binding carrier

use serde::{Deserialize, Serialize};

/// A path-identified mount of project content inside a running instance.
///
/// Bindings are unique by path within one instance; the path is the whole
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectBinding {
    path: String,
}

impl ProjectBinding {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
