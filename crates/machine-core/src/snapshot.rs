//! Snapshot carriers: frozen instance state and its persistable key

use crate::error::{MachineError, Result};
use crate::project::ProjectBinding;
use crate::recipe::Recipe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Opaque, backend-defined handle to a stored instance snapshot.
///
/// The JSON form is the only representation that leaves this crate: it is
/// handed to external storage and later handed back unchanged to restore
/// the snapshot. Fields stay ordered so the JSON is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotKey {
    fields: BTreeMap<String, String>,
}

impl SnapshotKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one backend-defined field, builder style.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| MachineError::Snapshot(format!("cannot serialize snapshot key: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| MachineError::InvalidSnapshot(format!("malformed snapshot key: {e}")))
    }
}

/// Immutable record of a frozen instance state.
///
/// Built by [`SnapshotBuilder`]; once built, only accessors exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    id: String,
    kind: String,
    recipe: Option<Recipe>,
    instance_key: SnapshotKey,
    owner: String,
    creation_date: DateTime<Utc>,
    workspace_id: String,
    projects: Vec<ProjectBinding>,
    description: String,
    workspace_bound: bool,
}

impl Snapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Recipe the snapshotted instance was originally built from, if it was
    /// not itself restored from a snapshot.
    pub fn recipe(&self) -> Option<&Recipe> {
        self.recipe.as_ref()
    }

    pub fn instance_key(&self) -> &SnapshotKey {
        &self.instance_key
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Bindings captured at snapshot time.
    pub fn projects(&self) -> &[ProjectBinding] {
        &self.projects
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_workspace_bound(&self) -> bool {
        self.workspace_bound
    }
}

/// Builder for [`Snapshot`] records.
///
/// `kind`, `workspace_id` and `instance_key` are required; `id` defaults to
/// a fresh v4 UUID and `creation_date` to the current time.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    id: Option<String>,
    kind: Option<String>,
    recipe: Option<Recipe>,
    instance_key: Option<SnapshotKey>,
    owner: String,
    creation_date: Option<DateTime<Utc>>,
    workspace_id: Option<String>,
    projects: Vec<ProjectBinding>,
    description: String,
    workspace_bound: bool,
}

impl SnapshotBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn recipe(mut self, recipe: Recipe) -> Self {
        self.recipe = Some(recipe);
        self
    }

    pub fn instance_key(mut self, key: SnapshotKey) -> Self {
        self.instance_key = Some(key);
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn projects(mut self, projects: Vec<ProjectBinding>) -> Self {
        self.projects = projects;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn workspace_bound(mut self, bound: bool) -> Self {
        self.workspace_bound = bound;
        self
    }

    pub fn build(self) -> Result<Snapshot> {
        let kind = self.kind.unwrap_or_default();
        if kind.is_empty() {
            return Err(MachineError::InvalidConfig(
                "snapshot kind must not be empty".to_string(),
            ));
        }
        let workspace_id = self.workspace_id.unwrap_or_default();
        if workspace_id.is_empty() {
            return Err(MachineError::InvalidConfig(
                "snapshot workspace id must not be empty".to_string(),
            ));
        }
        let instance_key = self.instance_key.ok_or_else(|| {
            MachineError::InvalidConfig("snapshot requires an instance key".to_string())
        })?;

        Ok(Snapshot {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            kind,
            recipe: self.recipe,
            instance_key,
            owner: self.owner,
            creation_date: self.creation_date.unwrap_or_else(Utc::now),
            workspace_id,
            projects: self.projects,
            description: self.description,
            workspace_bound: self.workspace_bound,
        })
    }
}
