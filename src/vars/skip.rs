// src/vars/skip.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::watch::path_utils::relative_str;

/// Decides whether a template is excluded from compilation.
///
/// Membership is exact string equality on the root-relative path (forward
/// slashes). A path that cannot be related to the root is never skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipPolicy {
    root: PathBuf,
    skip: BTreeSet<String>,
}

impl SkipPolicy {
    pub fn new(root: impl Into<PathBuf>, skip: BTreeSet<String>) -> Self {
        Self {
            root: root.into(),
            skip,
        }
    }

    pub fn is_skipped(&self, path: &Path) -> bool {
        if self.skip.is_empty() {
            return false;
        }
        match relative_str(&self.root, path) {
            Some(rel) => self.skip.contains(&rel),
            None => false,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.skip.iter().map(String::as_str)
    }
}
