#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use jinja2config::config::{RawSettings, Settings};
use jinja2config::errors::Jinja2ConfigError;
use jinja2config::vars::{EntityFuture, EntitySnapshot, EntitySource, GLOBAL_CONFIG_FILE};
use serde_json::Value;
use tempfile::TempDir;

/// A temporary watched root with helpers for writing templates.
pub struct TemplateTree {
    dir: TempDir,
    root: PathBuf,
}

impl TemplateTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp root");
        // Canonical, so paths match what the watcher and skip policy see.
        let root = dir.path().canonicalize().expect("canonicalize temp root");
        Self { dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write a file (creating parent directories) and return its path.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write file");
        path
    }

    pub fn write_global_config(&self, yaml: &str) -> PathBuf {
        self.write(GLOBAL_CONFIG_FILE, yaml)
    }

    pub fn read(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.path(rel)).ok()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.path(rel)).expect("remove file");
    }

    /// Names of every entry directly under `rel`, sorted.
    pub fn list(&self, rel: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path(rel))
            .expect("read dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Default for TemplateTree {
    fn default() -> Self {
        Self::new()
    }
}

/// `sh` scripts standing in for the renderer and formatter.
///
/// They live in their own temp directory, outside any watched root.
pub struct ShTools {
    dir: TempDir,
}

/// Echoes the template, or fails like a renderer hitting an undefined
/// variable when the template contains `FAIL`.
const RENDERER: &str = r#"
case "$(cat "$1")" in
  *FAIL*) echo "undefined variable x" >&2; exit 1 ;;
esac
cat "$1"
"#;

/// Emits the context file it was handed.
const CONTEXT_RENDERER: &str = r#"
cat "$2"
"#;

const SLOW_RENDERER: &str = r#"
sleep 5
cat "$1"
"#;

/// Appends a marker so tests can tell the formatter ran on the output.
const FORMATTER: &str = r#"
printf '# formatted\n' >> "$1"
"#;

const FAILING_FORMATTER: &str = r#"
echo "formatter exploded" >&2
exit 2
"#;

impl ShTools {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create tools dir");
        let tools = Self { dir };
        tools.write("render.sh", RENDERER);
        tools.write("context.sh", CONTEXT_RENDERER);
        tools.write("slow.sh", SLOW_RENDERER);
        tools.write("format.sh", FORMATTER);
        tools.write("format-fail.sh", FAILING_FORMATTER);
        tools
    }

    fn write(&self, name: &str, body: &str) {
        fs::write(self.dir.path().join(name), body).expect("write script");
    }

    pub fn script(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    /// Settings using the echo-or-fail renderer and the marker formatter.
    pub fn settings(&self) -> SettingsBuilder {
        SettingsBuilder::new()
            .renderer("sh", [self.script("render.sh"), "{template}".into(), "{context}".into()])
            .formatter("sh", [self.script("format.sh"), "{file}".into()])
    }

    pub fn context_renderer(&self, builder: SettingsBuilder) -> SettingsBuilder {
        builder.renderer("sh", [self.script("context.sh"), "{template}".into(), "{context}".into()])
    }

    pub fn slow_renderer(&self, builder: SettingsBuilder) -> SettingsBuilder {
        builder.renderer("sh", [self.script("slow.sh"), "{template}".into(), "{context}".into()])
    }

    pub fn failing_formatter(&self, builder: SettingsBuilder) -> SettingsBuilder {
        builder.formatter("sh", [self.script("format-fail.sh"), "{file}".into()])
    }
}

impl Default for ShTools {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for validated `Settings`. Entity fetching is off by default.
pub struct SettingsBuilder {
    raw: RawSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        let mut raw = RawSettings::default();
        raw.entities.enabled = false;
        Self { raw }
    }

    pub fn renderer<const N: usize>(mut self, program: &str, args: [String; N]) -> Self {
        self.raw.renderer.program = program.to_string();
        self.raw.renderer.args = args.to_vec();
        self
    }

    pub fn formatter<const N: usize>(mut self, program: &str, args: [String; N]) -> Self {
        self.raw.formatter.program = program.to_string();
        self.raw.formatter.args = args.to_vec();
        self
    }

    pub fn strict_formatter(mut self, strict: bool) -> Self {
        self.raw.formatter.strict = strict;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.raw.process.timeout_secs = Some(secs);
        self
    }

    pub fn try_build(self) -> Result<Settings, Jinja2ConfigError> {
        Settings::try_from(self.raw)
    }

    pub fn build(self) -> Settings {
        self.try_build().expect("valid settings from builder")
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Entity source returning a fixed answer.
pub struct StaticEntitySource {
    snapshot: Option<EntitySnapshot>,
    fail: bool,
}

impl StaticEntitySource {
    /// Answers with `entity_id -> state object` for each given state.
    pub fn with_states(states: impl IntoIterator<Item = Value>) -> Self {
        let snapshot = jinja2config::vars::entities::snapshot_from_states(states.into_iter().collect());
        Self {
            snapshot: Some(snapshot),
            fail: false,
        }
    }

    /// Always fails, like an unreachable API.
    pub fn failing() -> Self {
        Self {
            snapshot: None,
            fail: true,
        }
    }
}

impl EntitySource for StaticEntitySource {
    fn fetch(&self) -> EntityFuture<'_> {
        Box::pin(async move {
            if self.fail {
                Err(Jinja2ConfigError::EntityFetch("static source set to fail".into()))
            } else {
                Ok(self.snapshot.clone())
            }
        })
    }
}
