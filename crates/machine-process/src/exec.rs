//! Blocking helper for running one command to completion

use crate::consumer::LineConsumer;
use crate::pump::StreamPump;
use machine_core::{MachineError, Result};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;

/// Run `command` to completion, relaying its output to `consumer`.
///
/// Blocks the calling thread until the process exits and both output
/// streams are fully drained. Each stream drains on its own pump thread;
/// within one stream, lines arrive in emission order. The first I/O error
/// captured while draining surfaces after the wait.
pub fn run_to_completion(
    command: &mut Command,
    consumer: Arc<dyn LineConsumer>,
) -> Result<ExitStatus> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|e| {
        MachineError::Machine(format!("cannot launch {:?}: {e}", command.get_program()))
    })?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MachineError::Machine("child stdout was not piped".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| MachineError::Machine("child stderr was not piped".to_string()))?;

    let out_pump = StreamPump::start(stdout, Arc::clone(&consumer));
    let err_pump = StreamPump::start(stderr, consumer);

    let status = child.wait()?;
    out_pump.wait();
    err_pump.wait();

    if let Some(err) = out_pump.take_error().or_else(|| err_pump.take_error()) {
        return Err(MachineError::Io(err));
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::MemoryLineConsumer;

    #[test]
    fn test_run_to_completion_relays_output() {
        let consumer = Arc::new(MemoryLineConsumer::new());
        let status = run_to_completion(
            Command::new("sh").args(["-c", "echo one; echo two"]),
            Arc::clone(&consumer) as Arc<dyn LineConsumer>,
        )
        .unwrap();
        assert!(status.success());
        assert_eq!(consumer.lines(), vec!["one", "two"]);
    }

    #[test]
    fn test_run_to_completion_merges_both_streams() {
        let consumer = Arc::new(MemoryLineConsumer::new());
        let status = run_to_completion(
            Command::new("sh").args(["-c", "echo out; echo err 1>&2"]),
            Arc::clone(&consumer) as Arc<dyn LineConsumer>,
        )
        .unwrap();
        assert!(status.success());
        let mut lines = consumer.lines();
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    }

    #[test]
    fn test_run_to_completion_returns_exit_status() {
        let consumer = Arc::new(MemoryLineConsumer::new());
        let status = run_to_completion(
            Command::new("sh").args(["-c", "exit 3"]),
            consumer as Arc<dyn LineConsumer>,
        )
        .unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_run_to_completion_missing_binary() {
        let consumer = Arc::new(MemoryLineConsumer::new());
        let err = run_to_completion(
            &mut Command::new("/definitely/not/here"),
            consumer as Arc<dyn LineConsumer>,
        )
        .unwrap_err();
        assert!(matches!(err, MachineError::Machine(_)));
    }

    #[test]
    fn test_run_to_completion_heavy_interleaved_output() {
        // Both streams get more than one pipe buffer of data; the drain
        // must keep up on both sides for the child to finish.
        let script = "i=0; while [ $i -lt 5000 ]; do echo oooooooooooooooooooooooo; \
                      echo eeeeeeeeeeeeeeeeeeeeeeee 1>&2; i=$((i+1)); done";
        let consumer = Arc::new(MemoryLineConsumer::new());
        let status = run_to_completion(
            Command::new("sh").args(["-c", script]),
            Arc::clone(&consumer) as Arc<dyn LineConsumer>,
        )
        .unwrap();
        assert!(status.success());
        assert_eq!(consumer.lines().len(), 10_000);
    }
}
