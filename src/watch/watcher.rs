// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::ChangeQueue;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::vars::VariableStore;
use crate::watch::event_handler::{apply_actions, translate_event, TemplateMatcher};

/// Everything the watcher task needs to turn events into queue entries.
#[derive(Debug, Clone)]
pub struct WatchContext {
    pub root: PathBuf,
    pub template_suffix: String,
    pub store: Arc<VariableStore>,
    pub fs: Arc<dyn FileSystem>,
    pub queue: Arc<ChangeQueue>,
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping the handle
/// stops file watching; [`WatcherHandle::stop`] additionally waits for the
/// event task to drain.
pub struct WatcherHandle {
    inner: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// Stop intake and wait for the event task to finish what it received.
    pub async fn stop(self) {
        let WatcherHandle { inner, task } = self;
        drop(inner);
        if let Err(err) = task.await {
            warn!(error = %err, "watcher task ended abnormally");
        }
        debug!("file watcher stopped");
    }
}

/// Watch `ctx.root` recursively and feed template changes into `ctx.queue`.
///
/// The notify callback only forwards events over a channel, so intake never
/// waits on compilation. Config changes trigger a reload plus full rebuild
/// inside the event task before later events are looked at.
pub fn spawn_watcher(ctx: WatchContext) -> Result<WatcherHandle> {
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    warn!(error = %err, "failed to forward notify event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&ctx.root, RecursiveMode::Recursive)?;
    info!(root = ?ctx.root, suffix = %ctx.template_suffix, "file watcher started");

    let matcher = TemplateMatcher::new(ctx.template_suffix.clone(), ctx.store.config_path());

    let task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            let actions = translate_event(&event, &matcher, ctx.fs.as_ref());
            if actions.is_empty() {
                continue;
            }
            apply_actions(
                actions,
                &ctx.store,
                ctx.fs.as_ref(),
                &ctx.template_suffix,
                &ctx.queue,
            )
            .await;
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { inner: watcher, task })
}
