//! Stream pumping for process output

use crate::consumer::LineConsumer;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

/// Pumps a byte stream to a [`LineConsumer`] on a dedicated background
/// thread.
///
/// The drain thread is detached: dropping the pump never blocks and
/// process exit does not wait for it. Completion is observed through
/// [`wait`](StreamPump::wait), [`is_done`](StreamPump::is_done) and the
/// error accessors.
#[derive(Debug)]
pub struct StreamPump {
    shared: Arc<PumpShared>,
}

#[derive(Debug, Default)]
struct PumpShared {
    stop: AtomicBool,
    state: Mutex<PumpState>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct PumpState {
    done: bool,
    error: Option<io::Error>,
}

impl StreamPump {
    /// Spawn the drain thread and return immediately.
    ///
    /// Lines are forwarded to `consumer` in stream order until end of
    /// stream or [`stop`](StreamPump::stop). A read error ends the drain.
    /// A consumer error is recorded and the remainder of the stream is
    /// still drained and discarded, so the writing process never stalls on
    /// a full pipe.
    pub fn start<R>(source: R, consumer: Arc<dyn LineConsumer>) -> Self
    where
        R: Read + Send + 'static,
    {
        let shared = Arc::new(PumpShared::default());
        let worker = Arc::clone(&shared);
        thread::spawn(move || {
            let error = drain(source, consumer, &worker);
            let mut state = worker
                .state
                .lock()
                .unwrap_or_else(|poison| poison.into_inner());
            state.error = error;
            state.done = true;
            drop(state);
            worker.cond.notify_all();
        });
        Self { shared }
    }

    /// Request a cooperative stop.
    ///
    /// Observed at line granularity: a pump blocked inside a read returns
    /// at end of stream, which for child pipes happens when the child
    /// exits or is killed.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Block until the drain thread has finished.
    ///
    /// Safe to call from several threads at once; all of them wake.
    pub fn wait(&self) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        while !state.done {
            state = self
                .shared
                .cond
                .wait(state)
                .unwrap_or_else(|poison| poison.into_inner());
        }
    }

    pub fn is_done(&self) -> bool {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .done
    }

    pub fn has_error(&self) -> bool {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .error
            .is_some()
    }

    /// Take ownership of the error captured while draining, if any.
    ///
    /// Drain errors are captured here instead of crossing the thread
    /// boundary; after this call the pump reports no error.
    pub fn take_error(&self) -> Option<io::Error> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .error
            .take()
    }
}

/// Reads `source` line by line, forwarding each line to `consumer`.
/// Returns the first error encountered, if any.
fn drain(
    source: impl Read,
    consumer: Arc<dyn LineConsumer>,
    shared: &PumpShared,
) -> Option<io::Error> {
    let reader = BufReader::new(source);
    let mut first_error = None;
    for line in reader.lines() {
        if shared.stop.load(Ordering::Acquire) {
            break;
        }
        match line {
            Ok(line) => {
                if first_error.is_some() {
                    continue;
                }
                if let Err(err) = consumer.write_line(&line) {
                    log::debug!("line consumer failed, draining the remainder: {err}");
                    first_error = Some(err);
                }
            }
            Err(err) => {
                first_error = Some(err);
                break;
            }
        }
    }
    first_error
}
