// src/fs/mock.rs

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::FileSystem;

#[derive(Debug, Clone)]
enum Node {
    File(String),
    Dir(BTreeSet<PathBuf>),
}

/// In-memory filesystem for tests.
///
/// Parent directories are created implicitly by [`MockFileSystem::add_file`].
/// Cloning shares the underlying tree.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    nodes: Arc<Mutex<BTreeMap<PathBuf, Node>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create or overwrite a file.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        let mut nodes = self.lock();
        if let Some(parent) = path.parent() {
            link_into_parent(&mut nodes, parent, &path);
        }
        nodes.insert(path, Node::File(content.into()));
    }

    /// Create an (empty) directory and its parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut nodes = self.lock();
        ensure_dir(&mut nodes, &path);
    }

    /// Remove a file or an empty directory.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.lock();
        nodes.remove(path);
        if let Some(parent) = path.parent() {
            if let Some(Node::Dir(children)) = nodes.get_mut(parent) {
                children.remove(path);
            }
        }
    }
}

fn ensure_dir(nodes: &mut BTreeMap<PathBuf, Node>, dir: &Path) {
    if nodes.contains_key(dir) {
        return;
    }
    nodes.insert(dir.to_path_buf(), Node::Dir(BTreeSet::new()));
    if let Some(parent) = dir.parent() {
        if !parent.as_os_str().is_empty() {
            link_into_parent(nodes, parent, dir);
        }
    }
}

fn link_into_parent(nodes: &mut BTreeMap<PathBuf, Node>, parent: &Path, child: &Path) {
    ensure_dir(nodes, parent);
    if let Some(Node::Dir(children)) = nodes.get_mut(parent) {
        children.insert(child.to_path_buf());
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("not found: {path:?}"))
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.lock().get(path) {
            Some(Node::File(content)) => Ok(content.clone()),
            Some(Node::Dir(_)) => Err(io::Error::other(format!("is a directory: {path:?}"))),
            None => Err(not_found(path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(Node::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(Node::Dir(_)))
    }

    fn is_symlink(&self, _path: &Path) -> bool {
        false
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        match self.lock().get(path) {
            Some(Node::Dir(children)) => Ok(children.iter().cloned().collect()),
            Some(Node::File(_)) => Err(io::Error::other(format!("not a directory: {path:?}"))),
            None => Err(not_found(path)),
        }
    }
}
