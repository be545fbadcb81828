// src/vars/store.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::fs::FileSystem;
use crate::vars::entities::{EntitySnapshot, EntitySource};
use crate::vars::global::{GlobalConfig, GLOBAL_CONFIG_FILE};
use crate::vars::merge::deep_merge_maps;
use crate::vars::skip::SkipPolicy;
use crate::watch::path_utils::relative_str;

/// Context key under which the entity snapshot is injected.
pub const ENTITIES_KEY: &str = "entities";

/// Variables handed to the renderer for one template.
pub type VariableContext = Map<String, Value>;

/// Immutable view of the cached variable state.
///
/// A reload builds a fresh snapshot and swaps it in; jobs that already hold
/// an `Arc` keep seeing the old one.
#[derive(Debug, Clone, Default)]
pub struct VariableSnapshot {
    root: PathBuf,
    base: Map<String, Value>,
    overrides: Map<String, Value>,
    skip: SkipPolicy,
    entities: Option<EntitySnapshot>,
}

impl VariableSnapshot {
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            skip: SkipPolicy::new(root.clone(), Default::default()),
            root,
            ..Default::default()
        }
    }

    pub fn from_parts(
        root: impl Into<PathBuf>,
        config: GlobalConfig,
        entities: Option<EntitySnapshot>,
    ) -> Self {
        let root = root.into();
        Self {
            skip: SkipPolicy::new(root.clone(), config.skip),
            root,
            base: config.base,
            overrides: config.overrides,
            entities,
        }
    }

    /// Freshly merged context for `path`.
    ///
    /// Foundation is the base variables plus the entity snapshot (if any)
    /// under [`ENTITIES_KEY`]; the override mapping registered for the
    /// root-relative form of `path` is deep-merged on top.
    pub fn context_for(&self, path: &Path) -> VariableContext {
        let mut foundation = self.base.clone();
        if let Some(entities) = &self.entities {
            foundation.insert(ENTITIES_KEY.to_string(), Value::Object(entities.clone()));
        }

        let overlay = relative_str(&self.root, path).and_then(|rel| self.overrides.get(&rel));
        match overlay {
            Some(Value::Object(overlay)) => deep_merge_maps(&foundation, overlay),
            Some(other) => {
                warn!(?path, found = %other, "file override is not a mapping; ignoring");
                foundation
            }
            None => foundation,
        }
    }

    pub fn is_skipped(&self, path: &Path) -> bool {
        self.skip.is_skipped(path)
    }

    pub fn skip_policy(&self) -> &SkipPolicy {
        &self.skip
    }

    pub fn base(&self) -> &Map<String, Value> {
        &self.base
    }

    pub fn entities(&self) -> Option<&EntitySnapshot> {
        self.entities.as_ref()
    }
}

/// Loads and caches the merged variable state for a watched root.
///
/// `reload` is the only writer. Readers take an `Arc` snapshot, so a reload
/// that starts mid-batch never changes the context of a compile already in
/// flight.
pub struct VariableStore {
    root: PathBuf,
    config_path: PathBuf,
    fs: Arc<dyn FileSystem>,
    entities: Arc<dyn EntitySource>,
    current: RwLock<Arc<VariableSnapshot>>,
}

impl std::fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableStore")
            .field("root", &self.root)
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}

impl VariableStore {
    /// Create a store with an empty snapshot. Call [`VariableStore::reload`]
    /// before use.
    pub fn new(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        entities: Arc<dyn EntitySource>,
    ) -> Self {
        let root = root.into();
        let config_path = root.join(GLOBAL_CONFIG_FILE);
        let current = RwLock::new(Arc::new(VariableSnapshot::empty(root.clone())));
        Self {
            root,
            config_path,
            fs,
            entities,
            current,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the reserved global config file.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Re-read the global config and refresh the entity snapshot.
    ///
    /// Never fails: config problems degrade to empty variables and fetch
    /// problems to an absent snapshot, each with a diagnostic.
    pub async fn reload(&self) {
        let config = GlobalConfig::load_or_empty(self.fs.as_ref(), &self.config_path);

        let entities = match self.entities.fetch().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, key = ENTITIES_KEY, "entity snapshot unavailable; key omitted from context");
                None
            }
        };

        let snapshot = VariableSnapshot::from_parts(self.root.clone(), config, entities);
        info!(
            variables = snapshot.base.len(),
            overrides = snapshot.overrides.len(),
            entities = snapshot.entities.as_ref().map(|e| e.len()),
            "variable context reloaded"
        );

        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(snapshot);
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<VariableSnapshot> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn context_for(&self, path: &Path) -> VariableContext {
        self.snapshot().context_for(path)
    }

    pub fn is_skipped(&self, path: &Path) -> bool {
        self.snapshot().is_skipped(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Jinja2ConfigError, Result};
    use crate::fs::mock::MockFileSystem;
    use crate::vars::entities::{DisabledEntitySource, EntityFuture};
    use serde_json::json;

    struct FailingSource;

    impl EntitySource for FailingSource {
        fn fetch(&self) -> EntityFuture<'_> {
            Box::pin(async {
                let res: Result<Option<EntitySnapshot>> =
                    Err(Jinja2ConfigError::EntityFetch("401 Unauthorized".to_string()));
                res
            })
        }
    }

    struct OneEntity;

    impl EntitySource for OneEntity {
        fn fetch(&self) -> EntityFuture<'_> {
            Box::pin(async {
                let mut snapshot = EntitySnapshot::new();
                snapshot.insert("light.hall".to_string(), json!({"state": "on"}));
                Ok(Some(snapshot))
            })
        }
    }

    fn store_with(config: &str, source: Arc<dyn EntitySource>) -> VariableStore {
        let fs = MockFileSystem::new();
        fs.add_file("/config/jinja2config.yaml", config);
        VariableStore::new("/config", Arc::new(fs), source)
    }

    #[tokio::test]
    async fn per_file_override_is_merged_over_base() {
        let store = store_with(
            "greeting: hi\nlight: {brightness: 100, color: warm}\nfile_overrides:\n  rooms/hall.yaml.jinja:\n    light: {brightness: 10}\n",
            Arc::new(DisabledEntitySource),
        );
        store.reload().await;

        let hall = store.context_for(Path::new("/config/rooms/hall.yaml.jinja"));
        assert_eq!(
            Value::Object(hall),
            json!({"greeting": "hi", "light": {"brightness": 10, "color": "warm"}})
        );

        let other = store.context_for(Path::new("/config/rooms/kitchen.yaml.jinja"));
        assert_eq!(
            Value::Object(other),
            json!({"greeting": "hi", "light": {"brightness": 100, "color": "warm"}})
        );
    }

    #[tokio::test]
    async fn failed_fetch_omits_entities_key() {
        let store = store_with("a: 1\n", Arc::new(FailingSource));
        store.reload().await;

        let ctx = store.context_for(Path::new("/config/x.yaml.jinja"));
        assert!(!ctx.contains_key(ENTITIES_KEY));
        assert_eq!(ctx.get("a"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn successful_fetch_injects_entities() {
        let store = store_with("a: 1\n", Arc::new(OneEntity));
        store.reload().await;

        let ctx = store.context_for(Path::new("/config/x.yaml.jinja"));
        assert_eq!(ctx[ENTITIES_KEY]["light.hall"]["state"], json!("on"));
    }

    #[tokio::test]
    async fn snapshot_held_across_reload_is_unchanged() {
        let fs = MockFileSystem::new();
        fs.add_file("/config/jinja2config.yaml", "version: 1\n");
        let store = VariableStore::new("/config", Arc::new(fs.clone()), Arc::new(DisabledEntitySource));
        store.reload().await;

        let before = store.snapshot();
        fs.add_file("/config/jinja2config.yaml", "version: 2\n");
        store.reload().await;

        assert_eq!(before.base().get("version"), Some(&json!(1)));
        assert_eq!(store.snapshot().base().get("version"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn skip_list_comes_from_global_config() {
        let store = store_with("skip_files: [old.yaml.jinja]\n", Arc::new(DisabledEntitySource));
        store.reload().await;

        assert!(store.is_skipped(Path::new("/config/old.yaml.jinja")));
        assert!(!store.is_skipped(Path::new("/config/new.yaml.jinja")));
    }
}
