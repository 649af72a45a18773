use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;

use crate::bytequeue::AsyncByteQueue;

pub struct FlusherConfig {
    /// How often the drain thread polls for newly committed bytes.
    pub poll_interval: Duration,
}

impl Default for FlusherConfig {
    fn default() -> Self {
        FlusherConfig {
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Drains committed trace bytes to a sink on a dedicated thread.
///
/// The flusher owns the consumer side of a queue: it polls
/// [`AsyncByteQueue::take_committed`] at the configured interval and writes
/// each chunk to the sink in order. Sink errors are logged and never
/// propagate back to the producer; the producer is never blocked on
/// consumer I/O.
///
/// Shutdown is cooperative. The producer stops writing, commits once more,
/// and calls [`stop`], which wakes the drain thread for a final drain and
/// joins it. Every byte committed before `stop` reaches the sink.
///
/// [`stop`]: TraceFlusher::stop
#[must_use]
pub struct TraceFlusher {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl TraceFlusher {
    /// Spawns the drain thread for `queue`, writing committed bytes to
    /// `sink`.
    pub fn spawn<W>(
        queue: Arc<AsyncByteQueue>,
        mut sink: W,
        config: FlusherConfig,
    ) -> anyhow::Result<Self>
    where
        W: Write + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name("trace-flusher".to_string())
            .spawn(move || {
                loop {
                    // Read the stop flag before draining so the drain that
                    // follows the producer's final commit always runs.
                    let stopping = thread_stop.load(Ordering::Acquire);
                    drain(&queue, &mut sink);
                    if stopping {
                        break;
                    }
                    std::thread::park_timeout(config.poll_interval);
                }
                if let Err(err) = sink.flush() {
                    log::error!("failed to flush trace sink: {err}");
                }
            })
            .context("failed to spawn trace flusher thread")?;
        Ok(TraceFlusher { stop, handle })
    }

    /// Signals shutdown, performs a final drain, and joins the thread.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Release);
        self.handle.thread().unpark();
        if self.handle.join().is_err() {
            log::error!("trace flusher thread panicked");
        }
    }
}

fn drain<W: Write>(queue: &AsyncByteQueue, sink: &mut W) {
    queue.take_committed(|chunk| {
        if let Err(err) = sink.write_all(chunk) {
            log::error!("failed to write trace data to sink: {err}");
        }
    });
}
