//! One command's execution inside an instance

use machine_core::{MachineError, Result};
use machine_process::{LineConsumer, ProcessSupervisor, StreamPump};
use std::fmt;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

/// One command invocation inside an instance.
///
/// The pid is allocated at construction and stays stable before, during
/// and after the run, so callers can address a process that has not
/// started yet. The OS process itself launches on [`start`] or
/// [`start_with_output`]; liveness is always derived from the OS, never
/// cached.
///
/// [`start`]: InstanceProcess::start
/// [`start_with_output`]: InstanceProcess::start_with_output
pub struct InstanceProcess {
    pid: u32,
    command_line: String,
    supervisor: Arc<dyn ProcessSupervisor>,
    inner: Mutex<ProcessInner>,
}

#[derive(Default)]
struct ProcessInner {
    command: Option<Command>,
    child: Option<Child>,
    native_pid: Option<u32>,
    started: bool,
}

impl InstanceProcess {
    pub(crate) fn new(
        pid: u32,
        command_line: String,
        command: Command,
        supervisor: Arc<dyn ProcessSupervisor>,
    ) -> Self {
        Self {
            pid,
            command_line,
            supervisor,
            inner: Mutex::new(ProcessInner {
                command: Some(command),
                ..ProcessInner::default()
            }),
        }
    }

    /// Stable process id, valid from construction.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Launch detached: no blocking, no output capture.
    ///
    /// Fails with `Conflict` when a start was already attempted and with
    /// `Machine` when the OS refuses the launch.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock_inner();
        let mut command = self.take_command(&mut inner)?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let child = self.spawn(command)?;
        inner.native_pid = Some(self.supervisor.native_pid(&child)?);
        inner.child = Some(child);
        Ok(())
    }

    /// Launch with piped output and block until both streams are fully
    /// drained and the process is reaped.
    ///
    /// Stdout and stderr drain on independent pump threads; within one
    /// stream, lines reach `consumer` in emission order. Draining ends at
    /// end-of-stream, which in practice coincides with process exit. The
    /// first I/O error captured while draining surfaces after the wait.
    pub fn start_with_output(&self, consumer: Arc<dyn LineConsumer>) -> Result<()> {
        let (stdout, stderr) = {
            let mut inner = self.lock_inner();
            let mut command = self.take_command(&mut inner)?;
            command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            let mut child = self.spawn(command)?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| MachineError::Machine("child stdout was not piped".to_string()))?;
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| MachineError::Machine("child stderr was not piped".to_string()))?;
            inner.native_pid = Some(self.supervisor.native_pid(&child)?);
            inner.child = Some(child);
            (stdout, stderr)
        };

        let out_pump = StreamPump::start(stdout, Arc::clone(&consumer));
        let err_pump = StreamPump::start(stderr, consumer);
        out_pump.wait();
        err_pump.wait();

        // Both streams are closed; reap unless kill() got there first.
        if let Some(mut child) = self.lock_inner().child.take() {
            child.wait()?;
        }

        if let Some(err) = out_pump.take_error().or_else(|| err_pump.take_error()) {
            return Err(MachineError::Io(err));
        }
        Ok(())
    }

    /// Non-blocking liveness probe, always derived from the OS.
    pub fn is_alive(&self) -> bool {
        let mut inner = self.lock_inner();
        if !inner.started {
            return false;
        }
        // Prefer the wait status while this object still owns the child;
        // checking it also reaps a process that exited on its own.
        if let Some(mut child) = inner.child.take() {
            match child.try_wait() {
                Ok(Some(_)) => return false,
                Ok(None) => {
                    inner.child = Some(child);
                    return true;
                }
                Err(_) => inner.child = Some(child),
            }
        }
        match inner.native_pid {
            Some(pid) => self.supervisor.is_alive(pid),
            None => false,
        }
    }

    /// Terminate the process and its descendant tree through the
    /// supervisor, then reap the child.
    ///
    /// A process that never started is a no-op success; there is nothing
    /// to deliver a signal to.
    pub fn kill(&self) -> Result<()> {
        let native_pid = {
            let inner = self.lock_inner();
            if !inner.started {
                return Ok(());
            }
            inner.native_pid
        };
        if let Some(pid) = native_pid {
            self.supervisor.kill_tree(pid)?;
        }
        if let Some(mut child) = self.lock_inner().child.take() {
            let _ = child.wait();
        }
        Ok(())
    }

    fn lock_inner(&self) -> MutexGuard<'_, ProcessInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Consume the prepared command; a second consumer is a conflict.
    fn take_command(&self, inner: &mut ProcessInner) -> Result<Command> {
        let command = inner.command.take().ok_or_else(|| {
            MachineError::Conflict(format!("process {} was already started", self.pid))
        })?;
        inner.started = true;
        Ok(command)
    }

    fn spawn(&self, mut command: Command) -> Result<Child> {
        command.spawn().map_err(|e| {
            MachineError::Machine(format!(
                "cannot launch process {} ({}): {e}",
                self.pid, self.command_line
            ))
        })
    }
}

impl fmt::Debug for InstanceProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock_inner();
        f.debug_struct("InstanceProcess")
            .field("pid", &self.pid)
            .field("command_line", &self.command_line)
            .field("started", &inner.started)
            .field("native_pid", &inner.native_pid)
            .finish_non_exhaustive()
    }
}
