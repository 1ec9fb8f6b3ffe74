//! Pluggable provider contract for building and restoring instances

use crate::instance::Instance;
use machine_core::{Recipe, Result, SnapshotKey};
use machine_process::LineConsumer;
use std::sync::Arc;

/// Factory for one kind of execution environment.
///
/// A provider turns recipes and stored snapshots into live [`Instance`]s
/// and owns the stored snapshots of its kind. Providers are registered
/// and selected by an outer orchestrator; this crate only defines the
/// contract.
pub trait InstanceProvider: Send + Sync {
    /// Unique backend identifier used for provider selection.
    fn kind(&self) -> &str;

    /// Recipe kinds this provider can build from.
    fn recipe_kinds(&self) -> Vec<String>;

    /// Whether `recipe` names a kind this provider can build from.
    fn supports_recipe(&self, recipe: &Recipe) -> bool {
        self.recipe_kinds().iter().any(|kind| kind == recipe.kind())
    }

    /// Build a new instance from `recipe`.
    ///
    /// Build progress is pushed to `logs` line by line as it happens;
    /// nothing is buffered for later replay. Fails with
    /// [`MachineError::UnsupportedRecipe`] when `recipe.kind()` is not in
    /// [`recipe_kinds`](Self::recipe_kinds), [`MachineError::InvalidRecipe`]
    /// for malformed recipe content and [`MachineError::Machine`] for
    /// backend failures. A failed call leaves no partially constructed
    /// instance reachable.
    ///
    /// [`MachineError::UnsupportedRecipe`]: machine_core::MachineError::UnsupportedRecipe
    /// [`MachineError::InvalidRecipe`]: machine_core::MachineError::InvalidRecipe
    /// [`MachineError::Machine`]: machine_core::MachineError::Machine
    fn create_instance(
        &self,
        recipe: &Recipe,
        logs: Arc<dyn LineConsumer>,
        workspace_id: &str,
        bind_workspace: bool,
    ) -> Result<Arc<Instance>>;

    /// Restore an instance from a snapshot taken earlier.
    ///
    /// Fails with [`MachineError::NotFound`] when the backing snapshot no
    /// longer exists and [`MachineError::InvalidSnapshot`] when the stored
    /// data cannot be used.
    ///
    /// [`MachineError::NotFound`]: machine_core::MachineError::NotFound
    /// [`MachineError::InvalidSnapshot`]: machine_core::MachineError::InvalidSnapshot
    fn restore_instance(
        &self,
        key: &SnapshotKey,
        logs: Arc<dyn LineConsumer>,
        workspace_id: &str,
        bind_workspace: bool,
    ) -> Result<Arc<Instance>>;

    /// Delete the stored snapshot behind `key`.
    ///
    /// Removing a key that is missing or was already removed fails with
    /// [`MachineError::Snapshot`]: a double remove points at a
    /// bookkeeping bug in the caller and is surfaced, not ignored.
    ///
    /// [`MachineError::Snapshot`]: machine_core::MachineError::Snapshot
    fn remove_instance_snapshot(&self, key: &SnapshotKey) -> Result<()>;
}
