//! Legacy image contract predating the snapshot SPI
//!
//! Older backends ship images instead of snapshots. The wire shape of an
//! image key is identical to a snapshot key, so the newer storage can hold
//! both; only the factory surface differs.

use crate::instance::Instance;
use machine_core::{Recipe, Result, SnapshotKey};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Keys share the snapshot wire shape; only the producing SPI differs.
pub type ImageKey = SnapshotKey;

/// Backend-reported properties of a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageMetadata {
    properties: BTreeMap<String, String>,
}

impl ImageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one property, builder style.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// A stored image that can materialize instances.
pub trait Image: Send + Sync {
    /// Handle for finding and removing this image later.
    fn key(&self) -> &ImageKey;

    fn metadata(&self) -> &ImageMetadata;

    /// Materialize a fresh instance of this image.
    fn create_instance(&self) -> Result<Arc<Instance>>;
}

/// Factory and store for one kind of image.
pub trait ImageProvider: Send + Sync {
    /// Build and store a new image from `recipe`.
    fn build(&self, recipe: &Recipe) -> Result<Box<dyn Image>>;

    /// Look up a stored image.
    ///
    /// Fails with [`MachineError::NotFound`] when no image matches `key`.
    ///
    /// [`MachineError::NotFound`]: machine_core::MachineError::NotFound
    fn find(&self, key: &ImageKey) -> Result<Box<dyn Image>>;

    /// Delete a stored image.
    fn remove(&self, key: &ImageKey) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceConfig;
    use crate::instance::InstanceBackend;
    use machine_core::{MachineError, MachineStatus, ProjectBinding};
    use machine_process::ProcessSupervisor;
    use std::process::{Child, Command};
    use std::sync::Mutex;

    struct NullBackend;

    impl InstanceBackend for NullBackend {
        fn mount_project(&self, _workspace_id: &str, _project: &ProjectBinding) -> Result<()> {
            Ok(())
        }

        fn unmount_project(&self, _workspace_id: &str, _project: &ProjectBinding) -> Result<()> {
            Ok(())
        }

        fn exec_command(&self, command_line: &str) -> Command {
            let mut command = Command::new("sh");
            command.args(["-c", command_line]);
            command
        }

        fn commit(&self, _owner: &str, label: &str) -> Result<SnapshotKey> {
            Ok(SnapshotKey::new().with_field("label", label))
        }

        fn teardown(&self) -> Result<()> {
            Ok(())
        }
    }

    struct NoopSupervisor;

    impl ProcessSupervisor for NoopSupervisor {
        fn native_pid(&self, child: &Child) -> Result<u32> {
            Ok(child.id())
        }

        fn is_alive(&self, _pid: u32) -> bool {
            false
        }

        fn kill_tree(&self, _pid: u32) -> Result<()> {
            Ok(())
        }

        fn system(&self, _command: &str) -> Result<i32> {
            Ok(0)
        }
    }

    /// Image handed out by [`FakeImageProvider`].
    struct StoredImage {
        key: ImageKey,
        metadata: ImageMetadata,
    }

    impl Image for StoredImage {
        fn key(&self) -> &ImageKey {
            &self.key
        }

        fn metadata(&self) -> &ImageMetadata {
            &self.metadata
        }

        fn create_instance(&self) -> Result<Arc<Instance>> {
            let config = InstanceConfig::builder()
                .kind("docker")
                .workspace_id("ws-1")
                .build()?;
            let instance = Arc::new(Instance::new(
                config,
                Box::new(NullBackend),
                Arc::new(NoopSupervisor),
            ));
            instance.mark_running()?;
            Ok(instance)
        }
    }

    /// In-memory provider exercising the legacy contract.
    struct FakeImageProvider {
        images: Mutex<BTreeMap<String, ImageMetadata>>,
    }

    impl FakeImageProvider {
        fn new() -> Self {
            Self {
                images: Mutex::new(BTreeMap::new()),
            }
        }
    }

    impl ImageProvider for FakeImageProvider {
        fn build(&self, recipe: &Recipe) -> Result<Box<dyn Image>> {
            let key = ImageKey::new()
                .with_field("registry", "localhost:5000")
                .with_field("tag", recipe.kind());
            let metadata = ImageMetadata::new().with_property("built-from", recipe.kind());
            self.images
                .lock()
                .unwrap()
                .insert(key.to_json()?, metadata.clone());
            Ok(Box::new(StoredImage { key, metadata }))
        }

        fn find(&self, key: &ImageKey) -> Result<Box<dyn Image>> {
            let json = key.to_json()?;
            let metadata = self
                .images
                .lock()
                .unwrap()
                .get(&json)
                .cloned()
                .ok_or_else(|| {
                    MachineError::NotFound(format!("no image stored for key {json}"))
                })?;
            Ok(Box::new(StoredImage {
                key: key.clone(),
                metadata,
            }))
        }

        fn remove(&self, key: &ImageKey) -> Result<()> {
            let json = key.to_json()?;
            if self.images.lock().unwrap().remove(&json).is_none() {
                return Err(MachineError::NotFound(format!(
                    "no image stored for key {json}"
                )));
            }
            Ok(())
        }
    }

    #[test]
    fn test_metadata_property_lookup() {
        let metadata = ImageMetadata::new()
            .with_property("os", "linux")
            .with_property("arch", "x86_64");
        assert_eq!(metadata.property("os"), Some("linux"));
        assert_eq!(metadata.property("size"), None);
        assert_eq!(metadata.properties().len(), 2);
    }

    #[test]
    fn test_image_key_round_trips_like_a_snapshot_key() {
        let key: ImageKey = ImageKey::new()
            .with_field("registry", "localhost:5000")
            .with_field("tag", "v1");
        let json = key.to_json().unwrap();
        assert_eq!(ImageKey::from_json(&json).unwrap(), key);
    }

    #[test]
    fn test_image_provider_round_trip() {
        let provider = FakeImageProvider::new();
        let image = provider
            .build(&Recipe::new("dockerfile", "FROM alpine"))
            .unwrap();
        assert_eq!(image.metadata().property("built-from"), Some("dockerfile"));

        let found = provider.find(image.key()).unwrap();
        assert_eq!(found.key(), image.key());

        let instance = found.create_instance().unwrap();
        assert_eq!(instance.status(), MachineStatus::Running);
        assert_eq!(instance.kind(), "docker");

        provider.remove(image.key()).unwrap();
        let err = provider.find(image.key()).err().unwrap();
        assert!(matches!(err, MachineError::NotFound(_)));
    }
}
