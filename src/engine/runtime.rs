// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::engine::debounce::DebounceWindow;
use crate::engine::dispatcher::{Dispatcher, JobRunner};
use crate::engine::queue::ChangeQueue;

/// Timing knobs for the flush loop.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// How often the queue is inspected.
    pub poll_interval: Duration,
    /// How long a window stays open before its batch is flushed.
    pub quiet_period: Duration,
}

/// Totals across every batch processed by one [`Runtime::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    pub jobs: usize,
    pub failed: usize,
}

/// Drives the debounce window and hands flushed batches to the dispatcher.
///
/// The loop owns no filesystem or process state: changes arrive through the
/// shared [`ChangeQueue`], and all job work happens inside [`Dispatcher`].
pub struct Runtime<R: JobRunner> {
    queue: Arc<ChangeQueue>,
    window: DebounceWindow,
    dispatcher: Dispatcher<R>,
    options: RuntimeOptions,
    shutdown: watch::Receiver<bool>,
}

impl<R: JobRunner> fmt::Debug for Runtime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("window", &self.window)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<R: JobRunner> Runtime<R> {
    pub fn new(
        queue: Arc<ChangeQueue>,
        dispatcher: Dispatcher<R>,
        options: RuntimeOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            window: DebounceWindow::new(options.quiet_period),
            dispatcher,
            options,
            shutdown,
        }
    }

    /// Main loop.
    ///
    /// - Polls the queue every `poll_interval`.
    /// - Flushes once the debounce window has been open longer than
    ///   `quiet_period`, and waits for the whole batch before polling again.
    /// - Stops when shutdown is signalled (or its sender is gone). A batch
    ///   already being dispatched is finished first.
    pub async fn run(mut self) -> RunSummary {
        info!(
            poll_ms = self.options.poll_interval.as_millis() as u64,
            quiet_secs = self.options.quiet_period.as_secs_f64(),
            "debounce loop started"
        );

        let mut summary = RunSummary::default();
        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.options.poll_interval,
            self.options.poll_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let has_pending = !self.queue.is_empty();
                    if self.window.poll(Instant::now().into_std(), has_pending) {
                        let batch = self.queue.take();
                        let report = self.dispatcher.dispatch(batch).await;
                        summary.batches += 1;
                        summary.jobs += report.total();
                        summary.failed += report.failed.len();
                    }
                }
            }
        }

        let dropped = self.queue.len();
        if dropped > 0 {
            info!(pending = dropped, "shutting down with unprocessed changes");
        }
        info!(batches = summary.batches, jobs = summary.jobs, "debounce loop stopped");
        summary
    }
}
