//! machine-core: Shared model for the machine lifecycle layer
//!
//! Error taxonomy, the status state machine, and the data carriers shared
//! by the process-supervision and instance crates.

pub mod error;
pub mod project;
pub mod recipe;
pub mod snapshot;
pub mod status;

pub use error::{MachineError, Result};
pub use project::ProjectBinding;
pub use recipe::Recipe;
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotKey};
pub use status::MachineStatus;
