// src/engine/queue.rs

use std::collections::HashMap;
use std::mem;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::types::ChangeEvent;

/// Pending changes shared between the watcher and the flush loop.
///
/// Appends and the flush-time swap go through the same mutex, so a batch
/// handed to the dispatcher never loses a concurrent append.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    pending: Mutex<Vec<ChangeEvent>>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, change: ChangeEvent) {
        self.lock().push(change);
    }

    pub fn extend(&self, changes: impl IntoIterator<Item = ChangeEvent>) {
        self.lock().extend(changes);
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Swap the pending list for an empty one and return what was queued.
    pub fn take(&self) -> Vec<ChangeEvent> {
        mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChangeEvent>> {
        // A panic while holding the lock cannot leave the Vec half-updated.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Collapse a batch to one event per path.
///
/// The last recorded kind wins; paths keep the order in which they were
/// first seen.
pub fn dedup_batch(batch: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut index: HashMap<PathBuf, usize> = HashMap::new();
    let mut out: Vec<ChangeEvent> = Vec::with_capacity(batch.len());

    for change in batch {
        match index.get(&change.path) {
            Some(&i) => out[i].kind = change.kind,
            None => {
                index.insert(change.path.clone(), out.len());
                out.push(change);
            }
        }
    }

    out
}
