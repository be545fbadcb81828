// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Default suffix identifying template files.
pub const DEFAULT_TEMPLATE_SUFFIX: &str = ".yaml.jinja";

/// Default extension stripped from a template to name its output.
pub const DEFAULT_TEMPLATE_EXTENSION: &str = ".jinja";

/// Placeholder replaced by the absolute template path.
pub const TEMPLATE_PLACEHOLDER: &str = "{template}";
/// Placeholder replaced by the scratch file holding the serialized context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";
/// Placeholder replaced by the file the formatter rewrites in place.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Tool settings as read from an optional TOML file.
///
/// ```toml
/// [renderer]
/// program = "jinja"
/// args = ["-d", "{context}", "{template}"]
///
/// [formatter]
/// program = "prettier"
/// args = ["--write", "{file}", "--log-level", "warn"]
/// strict = false
///
/// [watch]
/// template_suffix = ".yaml.jinja"
/// template_extension = ".jinja"
/// debounce_secs = 5
/// poll_interval_ms = 1000
///
/// [entities]
/// enabled = true
/// base_url = "http://supervisor/core/api"
/// token_env = "SUPERVISOR_TOKEN"
///
/// [process]
/// timeout_secs = 60
/// ```
///
/// Every section is optional. Use `Settings::try_from` to validate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub renderer: RendererSection,

    #[serde(default)]
    pub formatter: FormatterSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub entities: EntitiesSection,

    #[serde(default)]
    pub process: ProcessSection,
}

/// Validated settings.
///
/// Only constructible through `TryFrom<RawSettings>` (or `Default`, which is
/// known to be valid), so consumers can rely on the invariants checked in
/// `validate.rs`.
#[derive(Debug, Clone)]
pub struct Settings {
    renderer: RendererSection,
    formatter: FormatterSection,
    watch: WatchSection,
    entities: EntitiesSection,
    process: ProcessSection,
}

impl Settings {
    /// Internal constructor used after validation.
    pub(crate) fn new_unchecked(raw: RawSettings) -> Self {
        Self {
            renderer: raw.renderer,
            formatter: raw.formatter,
            watch: raw.watch,
            entities: raw.entities,
            process: raw.process,
        }
    }

    pub fn renderer(&self) -> &RendererSection {
        &self.renderer
    }

    pub fn formatter(&self) -> &FormatterSection {
        &self.formatter
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }

    pub fn entities(&self) -> &EntitiesSection {
        &self.entities
    }

    pub fn process(&self) -> &ProcessSection {
        &self.process
    }

    pub fn template_suffix(&self) -> &str {
        &self.watch.template_suffix
    }

    pub fn template_extension(&self) -> &str {
        &self.watch.template_extension
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.watch.debounce_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.poll_interval_ms)
    }

    /// Upper bound for a single renderer/formatter invocation, if configured.
    pub fn process_timeout(&self) -> Option<Duration> {
        self.process.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new_unchecked(RawSettings::default())
    }
}

/// `[renderer]` section: the external template engine.
#[derive(Debug, Clone, Deserialize)]
pub struct RendererSection {
    #[serde(default = "default_renderer_program")]
    pub program: String,

    /// Arguments; `{template}` and `{context}` are substituted per job.
    #[serde(default = "default_renderer_args")]
    pub args: Vec<String>,
}

fn default_renderer_program() -> String {
    "jinja".to_string()
}

fn default_renderer_args() -> Vec<String> {
    vec![
        "-d".to_string(),
        CONTEXT_PLACEHOLDER.to_string(),
        TEMPLATE_PLACEHOLDER.to_string(),
    ]
}

impl Default for RendererSection {
    fn default() -> Self {
        Self {
            program: default_renderer_program(),
            args: default_renderer_args(),
        }
    }
}

/// `[formatter]` section: rewrites the rendered file in place.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatterSection {
    #[serde(default = "default_formatter_program")]
    pub program: String,

    /// Arguments; `{file}` is substituted with the scratch file path.
    #[serde(default = "default_formatter_args")]
    pub args: Vec<String>,

    /// When true a formatter failure fails the job; otherwise it is logged and
    /// the unformatted render is written.
    #[serde(default)]
    pub strict: bool,
}

fn default_formatter_program() -> String {
    "prettier".to_string()
}

fn default_formatter_args() -> Vec<String> {
    vec![
        "--write".to_string(),
        FILE_PLACEHOLDER.to_string(),
        "--log-level".to_string(),
        "warn".to_string(),
    ]
}

impl Default for FormatterSection {
    fn default() -> Self {
        Self {
            program: default_formatter_program(),
            args: default_formatter_args(),
            strict: false,
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// File-name suffix that marks a file as a template.
    #[serde(default = "default_template_suffix")]
    pub template_suffix: String,

    /// Trailing part of the suffix removed to form the output name.
    #[serde(default = "default_template_extension")]
    pub template_extension: String,

    /// Quiet period after the first pending change before a batch is flushed.
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,

    /// How often the debounce loop checks the queue.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_template_suffix() -> String {
    DEFAULT_TEMPLATE_SUFFIX.to_string()
}

fn default_template_extension() -> String {
    DEFAULT_TEMPLATE_EXTENSION.to_string()
}

fn default_debounce_secs() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            template_suffix: default_template_suffix(),
            template_extension: default_template_extension(),
            debounce_secs: default_debounce_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// `[entities]` section: the remote entity-state source.
#[derive(Debug, Clone, Deserialize)]
pub struct EntitiesSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL; `/states` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://supervisor/core/api".to_string()
}

fn default_token_env() -> String {
    "SUPERVISOR_TOKEN".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for EntitiesSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            token_env: default_token_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// `[process]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessSection {
    /// Kill a renderer/formatter that runs longer than this. Unset means wait
    /// indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}
