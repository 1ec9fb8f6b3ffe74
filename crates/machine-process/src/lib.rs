//! machine-process: Host OS process plumbing for machine instances
//!
//! Line consumers, stream pumps, process-table discovery, and the process
//! supervisor used to terminate whole process trees.

pub mod consumer;
pub mod exec;
pub mod pump;
pub mod supervisor;
pub mod table;

pub use consumer::{LineConsumer, MemoryLineConsumer, NullLineConsumer};
pub use exec::run_to_completion;
pub use pump::StreamPump;
#[cfg(unix)]
pub use supervisor::UnixSupervisor;
pub use supervisor::{host_supervisor, ProcessSupervisor};
pub use table::{ProcessTable, ProcessTableEntry};
