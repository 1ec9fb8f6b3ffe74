//! Error types for machine operations

use std::io;
use thiserror::Error;

/// Result type for machine operations
pub type Result<T> = std::result::Result<T, MachineError>;

/// Errors that can occur during machine operations
#[derive(Error, Debug)]
pub enum MachineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unsupported recipe type: {0}")]
    UnsupportedRecipe(String),

    #[error("Invalid recipe: {0}")]
    InvalidRecipe(String),

    #[error("Invalid instance snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Machine error: {0}")]
    Machine(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Capability mismatch with the running platform. Not a transient
    /// failure; callers must not retry.
    #[error("Unsupported on this platform: {0}")]
    UnsupportedPlatform(String),
}

impl MachineError {
    /// True for errors that signal a platform capability gap rather than
    /// an operational failure.
    pub fn is_platform_mismatch(&self) -> bool {
        matches!(self, MachineError::UnsupportedPlatform(_))
    }
}
