// src/engine/mod.rs

//! Batching engine for jinja2config.
//!
//! This module ties together:
//! - the shared change queue fed by the watcher
//! - the debounce window that decides when a batch is flushed
//! - the dispatcher that runs one batch of jobs concurrently
//! - the polling loop that drives all of the above until shutdown
//!
//! The debounce window and batch dedup are pure and unit tested without
//! Tokio; the async shell lives in [`runtime`] and [`dispatcher`].

use std::path::PathBuf;

pub mod debounce;
pub mod dispatcher;
pub mod queue;
pub mod runtime;

pub use debounce::DebounceWindow;
pub use dispatcher::{Dispatcher, JobFuture, JobRunner};
pub use queue::{dedup_batch, ChangeQueue};
pub use runtime::{RunSummary, Runtime, RuntimeOptions};

/// Outcome of a single compile/remove job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Compiled,
    Removed,
    Skipped,
    Failed,
}

/// Per-batch tally, returned once every job in the batch has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub compiled: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: Vec<PathBuf>,
}

impl BatchReport {
    pub fn record(&mut self, path: PathBuf, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Compiled => self.compiled += 1,
            JobOutcome::Removed => self.removed += 1,
            JobOutcome::Skipped => self.skipped += 1,
            JobOutcome::Failed => self.failed.push(path),
        }
    }

    pub fn total(&self) -> usize {
        self.compiled + self.removed + self.skipped + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
