// src/vars/global.rs

//! The reserved `jinja2config.yaml` at the watched root.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{Jinja2ConfigError, Result};
use crate::fs::FileSystem;

/// File name of the reserved global config, relative to the root.
pub const GLOBAL_CONFIG_FILE: &str = "jinja2config.yaml";

/// Reserved key: per-file variable overrides keyed by root-relative path.
pub const OVERRIDES_KEY: &str = "file_overrides";

/// Reserved key: root-relative template paths excluded from compilation.
pub const SKIP_KEY: &str = "skip_files";

/// Parsed global config, split into its three parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalConfig {
    /// Every top-level key that is not reserved.
    pub base: Map<String, Value>,
    /// Raw override entries. Non-mapping entries are kept here but ignored at
    /// lookup time.
    pub overrides: Map<String, Value>,
    pub skip: BTreeSet<String>,
}

impl GlobalConfig {
    /// Parse YAML text.
    ///
    /// An empty document is an empty config. A top-level value that is not a
    /// mapping is an error. Malformed reserved keys are ignored with a warning
    /// rather than failing the whole file.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_yaml_ng::from_str(text)?;

        let mut top = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(Jinja2ConfigError::ConfigError(format!(
                    "top-level value must be a mapping, found {}",
                    kind_name(&other)
                )));
            }
        };

        let overrides = match top.remove(OVERRIDES_KEY) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                warn!(
                    key = OVERRIDES_KEY,
                    found = kind_name(&other),
                    "reserved key is not a mapping; ignoring"
                );
                Map::new()
            }
        };

        let skip = match top.remove(SKIP_KEY) {
            None | Some(Value::Null) => BTreeSet::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    other => {
                        warn!(key = SKIP_KEY, entry = %other, "non-string skip entry; ignoring");
                        None
                    }
                })
                .collect(),
            Some(other) => {
                warn!(
                    key = SKIP_KEY,
                    found = kind_name(&other),
                    "reserved key is not a sequence; ignoring"
                );
                BTreeSet::new()
            }
        };

        Ok(Self {
            base: top,
            overrides,
            skip,
        })
    }

    /// Load from `path`, never failing.
    ///
    /// A missing file, unreadable file or malformed content all degrade to an
    /// empty config with a diagnostic.
    pub fn load_or_empty(fs: &dyn FileSystem, path: &Path) -> Self {
        let text = match fs.read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(?path, "no global config file; using empty variables");
                return Self::default();
            }
            Err(err) => {
                warn!(?path, error = %err, "failed to read global config; using empty variables");
                return Self::default();
            }
        };

        match Self::parse(&text) {
            Ok(cfg) => {
                debug!(
                    ?path,
                    variables = cfg.base.len(),
                    overrides = cfg.overrides.len(),
                    skipped = cfg.skip.len(),
                    "loaded global config"
                );
                cfg
            }
            Err(err) => {
                warn!(?path, error = %err, "invalid global config; using empty variables");
                Self::default()
            }
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
