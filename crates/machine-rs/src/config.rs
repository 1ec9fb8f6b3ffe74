//! Instance identity and configuration

use machine_core::{MachineError, Recipe, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and placement of one instance.
///
/// Built through [`InstanceConfigBuilder`]; immutable afterwards. A
/// workspace-bound instance is the workspace's primary dev environment,
/// which turns explicit project binding and unbinding into no-ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    id: String,
    kind: String,
    owner: String,
    workspace_id: String,
    workspace_bound: bool,
    display_name: String,
    recipe: Option<Recipe>,
}

impl InstanceConfig {
    pub fn builder() -> InstanceConfigBuilder {
        InstanceConfigBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Backend identifier, used for provider selection.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn is_workspace_bound(&self) -> bool {
        self.workspace_bound
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Recipe the instance is built from; absent when restored from a
    /// snapshot.
    pub fn recipe(&self) -> Option<&Recipe> {
        self.recipe.as_ref()
    }
}

/// Builder for [`InstanceConfig`].
///
/// `kind` and `workspace_id` are required; `id` defaults to a fresh v4
/// UUID and `display_name` falls back to the id.
#[derive(Debug, Default)]
pub struct InstanceConfigBuilder {
    id: Option<String>,
    kind: Option<String>,
    owner: String,
    workspace_id: Option<String>,
    workspace_bound: bool,
    display_name: String,
    recipe: Option<Recipe>,
}

impl InstanceConfigBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn workspace_bound(mut self, bound: bool) -> Self {
        self.workspace_bound = bound;
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn recipe(mut self, recipe: Recipe) -> Self {
        self.recipe = Some(recipe);
        self
    }

    pub fn build(self) -> Result<InstanceConfig> {
        let kind = self.kind.unwrap_or_default();
        if kind.is_empty() {
            return Err(MachineError::InvalidConfig(
                "instance kind must not be empty".to_string(),
            ));
        }
        let workspace_id = self.workspace_id.unwrap_or_default();
        if workspace_id.is_empty() {
            return Err(MachineError::InvalidConfig(
                "instance workspace id must not be empty".to_string(),
            ));
        }
        let id = self.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let display_name = if self.display_name.is_empty() {
            id.clone()
        } else {
            self.display_name
        };

        Ok(InstanceConfig {
            id,
            kind,
            owner: self.owner,
            workspace_id,
            workspace_bound: self.workspace_bound,
            display_name,
            recipe: self.recipe,
        })
    }
}
