use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jinja2config::engine::{JobFuture, JobOutcome, JobRunner};
use jinja2config::types::ChangeEvent;

/// A fake job runner that:
/// - records every job it was handed, in start order
/// - optionally sleeps to simulate a slow compile
/// - reports `Failed` for configured paths
/// - tracks how many jobs were running at the same time
#[derive(Default)]
pub struct FakeRunner {
    started: Mutex<Vec<ChangeEvent>>,
    finished: Mutex<Vec<ChangeEvent>>,
    failing: HashSet<PathBuf>,
    delay: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing.insert(path.into());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn started(&self) -> Vec<ChangeEvent> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<ChangeEvent> {
        self.finished.lock().unwrap().clone()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl JobRunner for FakeRunner {
    fn run_job<'a>(&'a self, change: &'a ChangeEvent) -> JobFuture<'a> {
        Box::pin(async move {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.started.lock().unwrap().push(change.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.finished.lock().unwrap().push(change.clone());
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&change.path) {
                JobOutcome::Failed
            } else if change.kind.is_removal() {
                JobOutcome::Removed
            } else {
                JobOutcome::Compiled
            }
        })
    }
}
