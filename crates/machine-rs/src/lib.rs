//! machine-rs: instance lifecycle on top of supervised host processes
//!
//! An [`Instance`] is one isolated execution environment: it is built from
//! a [`Recipe`] or restored from a [`SnapshotKey`] by an
//! [`InstanceProvider`], runs commands as supervised [`InstanceProcess`]es,
//! mounts projects through its [`InstanceBackend`], and can freeze its
//! state back into a snapshot. Host-OS plumbing (pid discovery, tree
//! kills, stream pumping) lives in `machine-process`; the shared data
//! carriers and the error taxonomy live in `machine-core`.

pub mod config;
pub mod image;
pub mod instance;
pub mod process;
pub mod provider;

pub use config::{InstanceConfig, InstanceConfigBuilder};
pub use image::{Image, ImageKey, ImageMetadata, ImageProvider};
pub use instance::{Instance, InstanceBackend};
pub use process::InstanceProcess;
pub use provider::InstanceProvider;

pub use machine_core::{
    MachineError, MachineStatus, ProjectBinding, Recipe, Result, Snapshot, SnapshotBuilder,
    SnapshotKey,
};
pub use machine_process::{
    host_supervisor, LineConsumer, MemoryLineConsumer, NullLineConsumer, ProcessSupervisor,
    StreamPump,
};
