// src/watch/event_handler.rs

//! Turning raw notify events into queue entries or config reloads.

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use tracing::{debug, info, warn};

use crate::engine::ChangeQueue;
use crate::fs::FileSystem;
use crate::types::{ChangeEvent, ChangeKind};
use crate::vars::VariableStore;
use crate::watch::path_utils::has_suffix;
use crate::watch::scan::queue_templates;

/// What the watcher should do for one notify event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    Enqueue(ChangeEvent),
    /// The reserved config changed: reload variables and rebuild everything.
    ReloadConfig,
}

/// Decides which paths the watcher cares about.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    suffix: String,
    config_path: PathBuf,
}

impl TemplateMatcher {
    pub fn new(suffix: impl Into<String>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            suffix: suffix.into(),
            config_path: config_path.into(),
        }
    }

    pub fn is_template(&self, path: &Path) -> bool {
        has_suffix(path, &self.suffix)
    }

    pub fn is_config(&self, path: &Path) -> bool {
        path == self.config_path
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

/// Map a notify event to watcher actions.
///
/// - create / modify of a template -> `Created` / `Modified`
/// - remove of a template -> `Deleted`
/// - rename -> `Deleted` for the source and `Created` for the destination,
///   for whichever endpoints are templates
/// - any change touching the reserved config -> a single `ReloadConfig`
///
/// `fs` is only consulted for renames whose direction notify could not tell.
pub fn translate_event(event: &Event, matcher: &TemplateMatcher, fs: &dyn FileSystem) -> Vec<WatchAction> {
    let mut actions = Vec::new();

    let touches_config = !matches!(event.kind, EventKind::Access(_))
        && event.paths.iter().any(|p| matcher.is_config(p));
    if touches_config {
        actions.push(WatchAction::ReloadConfig);
    }

    let mut push = |path: &PathBuf, kind: ChangeKind| {
        if matcher.is_template(path) {
            actions.push(WatchAction::Enqueue(ChangeEvent::new(path.clone(), kind)));
        }
    };

    match &event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {}
        EventKind::Create(_) => event.paths.iter().for_each(|p| push(p, ChangeKind::Created)),
        EventKind::Remove(_) => event.paths.iter().for_each(|p| push(p, ChangeKind::Deleted)),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::Both if event.paths.len() >= 2 => {
                push(&event.paths[0], ChangeKind::Deleted);
                push(&event.paths[1], ChangeKind::Created);
            }
            RenameMode::From => event.paths.iter().for_each(|p| push(p, ChangeKind::Deleted)),
            RenameMode::To => event.paths.iter().for_each(|p| push(p, ChangeKind::Created)),
            _ => {
                for path in &event.paths {
                    if fs.is_file(path) {
                        push(path, ChangeKind::Created);
                    } else if !fs.exists(path) {
                        push(path, ChangeKind::Deleted);
                    }
                }
            }
        },
        EventKind::Modify(_) => event.paths.iter().for_each(|p| push(p, ChangeKind::Modified)),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
    }

    actions
}

/// Reload variables, then enqueue a recompile of every non-skipped template.
///
/// Returns the number of jobs enqueued. Scan failures are logged and yield 0.
pub async fn rebuild_all(
    store: &VariableStore,
    fs: &dyn FileSystem,
    suffix: &str,
    queue: &ChangeQueue,
) -> usize {
    store.reload().await;
    let snapshot = store.snapshot();

    match queue_templates(fs, store.root(), suffix, &snapshot, ChangeKind::Modified, queue) {
        Ok(n) => {
            info!(templates = n, "global config changed; full rebuild queued");
            n
        }
        Err(err) => {
            warn!(root = ?store.root(), error = %err, "failed to scan templates for rebuild");
            0
        }
    }
}

/// Apply the actions for one event.
pub async fn apply_actions(
    actions: Vec<WatchAction>,
    store: &VariableStore,
    fs: &dyn FileSystem,
    suffix: &str,
    queue: &ChangeQueue,
) {
    for action in actions {
        match action {
            WatchAction::Enqueue(change) => {
                debug!(path = ?change.path, kind = %change.kind, "queued change");
                queue.push(change);
            }
            WatchAction::ReloadConfig => {
                rebuild_all(store, fs, suffix, queue).await;
            }
        }
    }
}
