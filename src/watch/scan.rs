// src/watch/scan.rs

//! Directory walks that discover template files.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::engine::ChangeQueue;
use crate::fs::FileSystem;
use crate::types::{ChangeEvent, ChangeKind};
use crate::vars::VariableSnapshot;
use crate::watch::path_utils::has_suffix;

/// Every file under `root` whose name ends with `suffix`, sorted.
///
/// Symlinked directories are not descended into. Only an unreadable `root`
/// is an error; a subdirectory that cannot be read is logged and skipped.
pub fn collect_templates(fs: &dyn FileSystem, root: &Path, suffix: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = Vec::new();

    visit_dir(fs, &fs.read_dir(root)?, suffix, &mut stack, &mut files);
    while let Some(dir) = stack.pop() {
        match fs.read_dir(&dir) {
            Ok(entries) => visit_dir(fs, &entries, suffix, &mut stack, &mut files),
            Err(err) => warn!(?dir, error = %err, "cannot read directory; skipping it"),
        }
    }

    files.sort();
    Ok(files)
}

fn visit_dir(
    fs: &dyn FileSystem,
    entries: &[PathBuf],
    suffix: &str,
    stack: &mut Vec<PathBuf>,
    files: &mut Vec<PathBuf>,
) {
    for path in entries {
        if fs.is_dir(path) {
            if fs.is_symlink(path) {
                debug!(?path, "not following directory symlink");
            } else {
                stack.push(path.clone());
            }
        } else if fs.is_file(path) && has_suffix(path, suffix) {
            files.push(path.clone());
        }
    }
}

/// Enqueue a `kind` job for every non-skipped template under `root`.
///
/// Returns the number of jobs enqueued.
pub fn queue_templates(
    fs: &dyn FileSystem,
    root: &Path,
    suffix: &str,
    snapshot: &VariableSnapshot,
    kind: ChangeKind,
    queue: &ChangeQueue,
) -> io::Result<usize> {
    let changes: Vec<ChangeEvent> = collect_templates(fs, root, suffix)?
        .into_iter()
        .filter(|path| {
            let skipped = snapshot.is_skipped(path);
            if skipped {
                debug!(?path, "skipping template listed in skip list");
            }
            !skipped
        })
        .map(|path| ChangeEvent::new(path, kind))
        .collect();

    let queued = changes.len();
    queue.extend(changes);
    Ok(queued)
}
