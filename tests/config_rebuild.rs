// tests/config_rebuild.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{DataChange, ModifyKind};
use notify::{Event, EventKind};

use jinja2config::engine::{dedup_batch, ChangeQueue};
use jinja2config::fs::mock::MockFileSystem;
use jinja2config::fs::FileSystem;
use jinja2config::types::ChangeKind;
use jinja2config::vars::{DisabledEntitySource, VariableStore};
use jinja2config::watch::event_handler::apply_actions;
use jinja2config::watch::{rebuild_all, translate_event, TemplateMatcher, WatchAction};
use jinja2config_test_utils::init_tracing;

const SUFFIX: &str = ".yaml.jinja";

fn four_templates() -> Arc<MockFileSystem> {
    let fs = MockFileSystem::new();
    fs.add_file("/cfg/a.yaml.jinja", "a");
    fs.add_file("/cfg/packages/b.yaml.jinja", "b");
    fs.add_file("/cfg/packages/c.yaml.jinja", "c");
    fs.add_file("/cfg/skipped.yaml.jinja", "d");
    fs.add_file("/cfg/a.yaml", "generated");
    Arc::new(fs)
}

fn store_on(fs: &Arc<MockFileSystem>) -> VariableStore {
    let dyn_fs: Arc<dyn FileSystem> = fs.clone();
    VariableStore::new("/cfg", dyn_fs, Arc::new(DisabledEntitySource))
}

fn paths(queue: &ChangeQueue) -> BTreeSet<PathBuf> {
    dedup_batch(queue.take()).into_iter().map(|c| c.path).collect()
}

#[tokio::test]
async fn config_edit_queues_every_non_skipped_template() {
    init_tracing();
    let fs = four_templates();
    fs.add_file("/cfg/jinja2config.yaml", "skip_files:\n  - skipped.yaml.jinja\n");
    let store = store_on(&fs);
    let queue = ChangeQueue::new();

    let n = rebuild_all(&store, fs.as_ref(), SUFFIX, &queue).await;
    assert_eq!(n, 3);

    let batch = queue.take();
    assert_eq!(batch.len(), 3);
    assert!(batch.iter().all(|c| c.kind == ChangeKind::Modified));
    assert!(!batch.iter().any(|c| c.path.ends_with("skipped.yaml.jinja")));
}

#[tokio::test]
async fn config_event_reloads_before_rebuilding() {
    let fs = four_templates();
    let store = store_on(&fs);
    store.reload().await;
    assert!(!store.is_skipped(Path::new("/cfg/skipped.yaml.jinja")));

    // The user adds a skip entry and a new variable.
    fs.add_file(
        "/cfg/jinja2config.yaml",
        "greeting: hi\nskip_files:\n  - skipped.yaml.jinja\n",
    );

    let matcher = TemplateMatcher::new(SUFFIX, store.config_path());
    let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
        .add_path(PathBuf::from("/cfg/jinja2config.yaml"));
    let actions = translate_event(&event, &matcher, fs.as_ref());
    assert_eq!(actions, vec![WatchAction::ReloadConfig]);

    let queue = ChangeQueue::new();
    apply_actions(actions, &store, fs.as_ref(), SUFFIX, &queue).await;

    assert_eq!(
        paths(&queue),
        BTreeSet::from([
            PathBuf::from("/cfg/a.yaml.jinja"),
            PathBuf::from("/cfg/packages/b.yaml.jinja"),
            PathBuf::from("/cfg/packages/c.yaml.jinja"),
        ])
    );
    assert!(store.is_skipped(Path::new("/cfg/skipped.yaml.jinja")));
    assert_eq!(
        store.context_for(Path::new("/cfg/a.yaml.jinja"))["greeting"],
        serde_json::json!("hi")
    );
}

#[tokio::test]
async fn deleting_the_config_rebuilds_with_empty_variables() {
    let fs = four_templates();
    fs.add_file("/cfg/jinja2config.yaml", "skip_files:\n  - skipped.yaml.jinja\n");
    let store = store_on(&fs);
    store.reload().await;

    fs.remove("/cfg/jinja2config.yaml");
    let queue = ChangeQueue::new();
    let n = rebuild_all(&store, fs.as_ref(), SUFFIX, &queue).await;

    assert_eq!(n, 4);
    assert!(store.snapshot().base().is_empty());
}

#[tokio::test]
async fn malformed_config_degrades_to_empty_context() {
    let fs = four_templates();
    fs.add_file("/cfg/jinja2config.yaml", "- just\n- a list\n");
    let store = store_on(&fs);
    let queue = ChangeQueue::new();

    let n = rebuild_all(&store, fs.as_ref(), SUFFIX, &queue).await;

    assert_eq!(n, 4);
    assert!(store.context_for(Path::new("/cfg/a.yaml.jinja")).is_empty());
}

#[tokio::test]
async fn template_events_skip_the_reload_path() {
    let fs = four_templates();
    let store = store_on(&fs);
    let matcher = TemplateMatcher::new(SUFFIX, store.config_path());
    let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
        .add_path(PathBuf::from("/cfg/packages/b.yaml.jinja"));

    let queue = ChangeQueue::new();
    let actions = translate_event(&event, &matcher, fs.as_ref());
    apply_actions(actions, &store, fs.as_ref(), SUFFIX, &queue).await;

    let batch = queue.take();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].path, PathBuf::from("/cfg/packages/b.yaml.jinja"));
    assert_eq!(batch[0].kind, ChangeKind::Modified);
}

/// Scan view where one subdirectory disappears between listing and reading.
#[derive(Debug)]
struct VanishingDir {
    inner: Arc<MockFileSystem>,
    gone: PathBuf,
}

impl FileSystem for VanishingDir {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        self.inner.read_to_string(path)
    }
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }
    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }
    fn is_symlink(&self, path: &Path) -> bool {
        self.inner.is_symlink(path)
    }
    fn read_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
        if path == self.gone {
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "vanished"));
        }
        self.inner.read_dir(path)
    }
}

#[tokio::test]
async fn rebuild_survives_a_vanished_subdirectory() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/cfg/a.yaml.jinja", "a");
    fs.add_file("/cfg/b.yaml.jinja", "b");
    fs.add_dir("/cfg/vanished");
    let store = store_on(&fs);
    let scan_fs = VanishingDir {
        inner: Arc::clone(&fs),
        gone: PathBuf::from("/cfg/vanished"),
    };
    let queue = ChangeQueue::new();

    let n = rebuild_all(&store, &scan_fs, SUFFIX, &queue).await;

    assert_eq!(n, 2);
    assert_eq!(
        paths(&queue),
        BTreeSet::from([
            PathBuf::from("/cfg/a.yaml.jinja"),
            PathBuf::from("/cfg/b.yaml.jinja"),
        ])
    );
}
