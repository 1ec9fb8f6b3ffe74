//! Host process supervision: pid discovery, liveness, tree termination

use machine_core::Result;
use std::process::Child;
use std::sync::Arc;

/// Host-OS process control.
///
/// One supervisor is constructed per host at startup and injected into
/// everything that tracks native processes; tests substitute fakes
/// through the same trait.
pub trait ProcessSupervisor: Send + Sync {
    /// Native OS pid of a spawned child.
    fn native_pid(&self, child: &Child) -> Result<u32>;

    /// Non-blocking liveness probe.
    fn is_alive(&self, pid: u32) -> bool;

    /// Kill `pid` and every live descendant, children before parents.
    ///
    /// Hard kill only, no graceful escalation. Descendants that cannot be
    /// signalled are logged and skipped; the call fails only when the root
    /// itself survives.
    fn kill_tree(&self, pid: u32) -> Result<()>;

    /// One synchronous shell invocation through the C library.
    ///
    /// Returns the decoded exit status, or the raw wait status when the
    /// shell did not exit normally. Bypasses the pump machinery entirely;
    /// meant for small fire-and-forget control commands.
    fn system(&self, command: &str) -> Result<i32>;
}

#[cfg(unix)]
mod unix {
    use super::ProcessSupervisor;
    use crate::table::ProcessTable;
    use machine_core::{MachineError, Result};
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;
    use std::ffi::CString;
    use std::io;
    use std::process::Child;

    /// Unix supervisor: null-signal liveness probes, `ps` based descendant
    /// discovery, SIGKILL sweeps, `system(3)`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct UnixSupervisor;

    impl UnixSupervisor {
        pub fn new() -> Self {
            Self
        }

        fn send_sigkill(pid: u32) -> nix::Result<()> {
            signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
        }
    }

    impl ProcessSupervisor for UnixSupervisor {
        fn native_pid(&self, child: &Child) -> Result<u32> {
            Ok(child.id())
        }

        fn is_alive(&self, pid: u32) -> bool {
            // Null signal: permission and existence are checked, nothing is
            // delivered.
            signal::kill(Pid::from_raw(pid as i32), None).is_ok()
        }

        fn kill_tree(&self, pid: u32) -> Result<()> {
            let table = ProcessTable::capture()?;
            for target in table.tree_kill_order(pid) {
                match Self::send_sigkill(target) {
                    Ok(()) => {}
                    Err(errno) if target == pid => {
                        // The root must end up dead; a pid that is already
                        // gone counts as dead.
                        if self.is_alive(pid) {
                            return Err(MachineError::Machine(format!(
                                "cannot kill process {pid}: {errno}"
                            )));
                        }
                    }
                    Err(errno) => {
                        log::warn!("cannot kill descendant {target} of {pid}: {errno}");
                    }
                }
            }
            Ok(())
        }

        fn system(&self, command: &str) -> Result<i32> {
            let line = CString::new(command).map_err(|_| {
                MachineError::Machine("shell command contains a NUL byte".to_string())
            })?;
            // SAFETY: `line` is NUL-terminated and outlives the call.
            let status = unsafe { libc::system(line.as_ptr()) };
            if status == -1 {
                return Err(MachineError::Io(io::Error::last_os_error()));
            }
            if libc::WIFEXITED(status) {
                Ok(libc::WEXITSTATUS(status))
            } else {
                Ok(status)
            }
        }
    }
}

#[cfg(unix)]
pub use unix::UnixSupervisor;

/// Supervisor for the running host.
///
/// Always succeeds on unix; the fallible signature is shared with hosts
/// where native process control is not implemented.
#[cfg(unix)]
pub fn host_supervisor() -> Result<Arc<dyn ProcessSupervisor>> {
    Ok(Arc::new(UnixSupervisor::new()))
}

/// Supervisor for the running host.
///
/// Fails with `UnsupportedPlatform` where native process control is not
/// implemented; that is a capability mismatch, not a transient error, and
/// must not be retried.
#[cfg(not(unix))]
pub fn host_supervisor() -> Result<Arc<dyn ProcessSupervisor>> {
    Err(machine_core::MachineError::UnsupportedPlatform(
        "native process supervision is only implemented for unix hosts".to_string(),
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_native_pid_matches_child_id() {
        let supervisor = UnixSupervisor::new();
        let mut child = Command::new("true").spawn().unwrap();
        assert_eq!(supervisor.native_pid(&child).unwrap(), child.id());
        child.wait().unwrap();
    }

    #[test]
    fn test_is_alive_for_own_process() {
        let supervisor = UnixSupervisor::new();
        assert!(supervisor.is_alive(std::process::id()));
    }

    #[test]
    fn test_is_alive_false_after_reap() {
        let supervisor = UnixSupervisor::new();
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(!supervisor.is_alive(pid));
    }

    #[test]
    fn test_kill_tree_terminates_single_process() {
        let supervisor = UnixSupervisor::new();
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        supervisor.kill_tree(pid).unwrap();
        let status = child.wait().unwrap();
        assert!(!status.success());
        assert!(!supervisor.is_alive(pid));
    }

    #[test]
    fn test_kill_tree_on_already_dead_pid() {
        let supervisor = UnixSupervisor::new();
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        // Reaped pid: the sweep must treat it as already dead.
        supervisor.kill_tree(pid).unwrap();
    }

    #[test]
    fn test_system_decodes_exit_status() {
        let supervisor = UnixSupervisor::new();
        assert_eq!(supervisor.system("exit 0").unwrap(), 0);
        assert_eq!(supervisor.system("exit 7").unwrap(), 7);
    }

    #[test]
    fn test_system_rejects_nul_bytes() {
        let supervisor = UnixSupervisor::new();
        assert!(supervisor.system("echo a\0b").is_err());
    }
}
