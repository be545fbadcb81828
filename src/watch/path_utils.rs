// src/watch/path_utils.rs

//! Path helpers shared by the watcher, the skip policy and the compiler.

use std::path::{Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
/// - Only if both attempts fail do we give up.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    // Different absolute prefixes for the same directory (symlinks,
    // /private/var on macOS) only line up after canonicalization.
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// True if the file name of `path` ends with `suffix`.
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(suffix))
        .unwrap_or(false)
}

/// Generated output path: `path` with `suffix` (the template extension, e.g.
/// `.jinja`) stripped from its file name.
///
/// Returns `None` when the file name does not carry the suffix, or when
/// stripping it would leave an empty name.
pub fn output_path(path: &Path, suffix: &str) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(suffix)?;
    if stem.is_empty() {
        return None;
    }
    Some(path.with_file_name(stem))
}

/// Error log path for a template: `<template>.errors.log` next to it.
pub fn error_log_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".errors.log");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_str_strips_root() {
        let rel = relative_str(Path::new("/config"), Path::new("/config/packages/a.yaml.jinja"));
        assert_eq!(rel.as_deref(), Some("packages/a.yaml.jinja"));
    }

    #[test]
    fn relative_str_rejects_outside_paths() {
        assert_eq!(relative_str(Path::new("/config"), Path::new("/elsewhere/a.yaml.jinja")), None);
    }

    #[test]
    fn output_path_strips_template_suffix() {
        assert_eq!(
            output_path(Path::new("/config/lights.yaml.jinja"), ".jinja"),
            Some(PathBuf::from("/config/lights.yaml"))
        );
        assert_eq!(output_path(Path::new("/config/lights.yaml"), ".jinja"), None);
        assert_eq!(output_path(Path::new("/config/.jinja"), ".jinja"), None);
    }

    #[test]
    fn error_log_sits_next_to_template() {
        assert_eq!(
            error_log_path(Path::new("/config/b.yaml.jinja")),
            PathBuf::from("/config/b.yaml.jinja.errors.log")
        );
    }

    #[test]
    fn suffix_check_uses_file_name() {
        assert!(has_suffix(Path::new("/c/a.yaml.jinja"), ".yaml.jinja"));
        assert!(!has_suffix(Path::new("/c/a.yaml.jinja.errors.log"), ".yaml.jinja"));
    }
}
