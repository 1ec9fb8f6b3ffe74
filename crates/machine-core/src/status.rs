//! Instance lifecycle status and its legal transitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a machine instance.
///
/// The transition table is fixed: `DESTROYED` is terminal and nothing
/// leaves it. `ERROR` is reachable from `CREATING` and `RUNNING` and can
/// only be left by destroying the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    Creating,
    Running,
    Saving,
    Destroyed,
    Error,
}

impl MachineStatus {
    /// True when moving from this status to `next` is legal.
    pub fn can_transition_to(self, next: MachineStatus) -> bool {
        use MachineStatus::*;
        matches!(
            (self, next),
            (Creating, Running)
                | (Creating, Error)
                | (Running, Saving)
                | (Running, Error)
                | (Running, Destroyed)
                | (Saving, Running)
                | (Error, Destroyed)
        )
    }

    /// True once no further transition is legal.
    pub fn is_terminal(self) -> bool {
        matches!(self, MachineStatus::Destroyed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MachineStatus::Creating => "CREATING",
            MachineStatus::Running => "RUNNING",
            MachineStatus::Saving => "SAVING",
            MachineStatus::Destroyed => "DESTROYED",
            MachineStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
