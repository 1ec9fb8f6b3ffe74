//! Line-oriented sinks for process output

use std::io;
use std::sync::Mutex;

/// Sink for one line of process output.
///
/// A pump delivers lines in emission order from a single thread, but one
/// consumer may be shared across several pumps, so implementations must
/// tolerate concurrent calls.
pub trait LineConsumer: Send + Sync {
    fn write_line(&self, line: &str) -> io::Result<()>;
}

/// Consumer that discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLineConsumer;

impl LineConsumer for NullLineConsumer {
    fn write_line(&self, _line: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Consumer that buffers received lines in memory.
#[derive(Debug, Default)]
pub struct MemoryLineConsumer {
    lines: Mutex<Vec<String>>,
}

impl MemoryLineConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every line received so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    /// Received lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

impl LineConsumer for MemoryLineConsumer {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(line.to_string());
        Ok(())
    }
}
