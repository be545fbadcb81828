// src/engine/dispatcher.rs

//! Runs one flushed batch of jobs.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::engine::queue::dedup_batch;
use crate::engine::{BatchReport, JobOutcome};
use crate::types::ChangeEvent;

pub type JobFuture<'a> = Pin<Box<dyn Future<Output = JobOutcome> + Send + 'a>>;

/// Trait abstracting how a single change is turned into work.
///
/// Production code uses [`crate::compile::Compiler`]; tests can provide a
/// recording runner that never spawns processes. Implementations report
/// failures through [`JobOutcome::Failed`] rather than panicking.
pub trait JobRunner: Send + Sync + 'static {
    fn run_job<'a>(&'a self, change: &'a ChangeEvent) -> JobFuture<'a>;
}

/// Fans a batch out to one Tokio task per distinct path and joins them all.
pub struct Dispatcher<R: JobRunner> {
    runner: Arc<R>,
}

impl<R: JobRunner> std::fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl<R: JobRunner> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
        }
    }
}

impl<R: JobRunner> Dispatcher<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &Arc<R> {
        &self.runner
    }

    /// Dedup `batch`, run every job concurrently and wait for all of them.
    ///
    /// Returning is the batch barrier: no job of this batch is still running
    /// afterwards. A panicking job is counted as failed.
    pub async fn dispatch(&self, batch: Vec<ChangeEvent>) -> BatchReport {
        let received = batch.len();
        let jobs = dedup_batch(batch);
        let mut report = BatchReport::default();

        if jobs.is_empty() {
            return report;
        }

        info!(events = received, jobs = jobs.len(), "processing batch");

        let mut set = JoinSet::new();
        let mut in_flight: Vec<PathBuf> = Vec::with_capacity(jobs.len());

        for change in jobs {
            debug!(path = ?change.path, kind = %change.kind, "spawning job");
            in_flight.push(change.path.clone());
            let runner = Arc::clone(&self.runner);
            set.spawn(async move {
                let outcome = runner.run_job(&change).await;
                (change.path, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((path, outcome)) => {
                    in_flight.retain(|p| p != &path);
                    report.record(path, outcome);
                }
                Err(err) => {
                    error!(error = %err, "job task panicked");
                }
            }
        }

        // Whatever is left never reported back.
        for path in in_flight {
            warn!(?path, "job did not complete; counting as failed");
            report.record(path, JobOutcome::Failed);
        }

        info!(
            compiled = report.compiled,
            removed = report.removed,
            skipped = report.skipped,
            failed = report.failed.len(),
            "batch complete"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::types::ChangeKind;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<ChangeEvent>>,
    }

    impl JobRunner for Recording {
        fn run_job<'a>(&'a self, change: &'a ChangeEvent) -> JobFuture<'a> {
            Box::pin(async move {
                self.seen.lock().unwrap().push(change.clone());
                if change.path == Path::new("/r/panic.yaml.jinja") {
                    panic!("boom");
                }
                if change.kind.is_removal() {
                    JobOutcome::Removed
                } else {
                    JobOutcome::Compiled
                }
            })
        }
    }

    #[tokio::test]
    async fn runs_one_job_per_path_with_last_kind() {
        let runner = Arc::new(Recording::default());
        let dispatcher = Dispatcher::new(Arc::clone(&runner));

        let report = dispatcher
            .dispatch(vec![
                ChangeEvent::new("/r/a.yaml.jinja", ChangeKind::Modified),
                ChangeEvent::new("/r/a.yaml.jinja", ChangeKind::Modified),
                ChangeEvent::new("/r/a.yaml.jinja", ChangeKind::Deleted),
                ChangeEvent::new("/r/b.yaml.jinja", ChangeKind::Created),
            ])
            .await;

        assert_eq!(report.removed, 1);
        assert_eq!(report.compiled, 1);
        assert!(report.is_success());

        let mut seen = runner.seen.lock().unwrap().clone();
        seen.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            seen,
            vec![
                ChangeEvent::new("/r/a.yaml.jinja", ChangeKind::Deleted),
                ChangeEvent::new("/r/b.yaml.jinja", ChangeKind::Created),
            ]
        );
    }

    #[tokio::test]
    async fn panicking_job_is_reported_as_failed() {
        let dispatcher = Dispatcher::new(Arc::new(Recording::default()));

        let report = dispatcher
            .dispatch(vec![
                ChangeEvent::new("/r/panic.yaml.jinja", ChangeKind::Modified),
                ChangeEvent::new("/r/ok.yaml.jinja", ChangeKind::Modified),
            ])
            .await;

        assert_eq!(report.compiled, 1);
        assert_eq!(report.failed, vec![PathBuf::from("/r/panic.yaml.jinja")]);
    }
}
