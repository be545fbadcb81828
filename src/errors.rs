// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Jinja2ConfigError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Entity fetch failed: {0}")]
    EntityFetch(String),

    #[error("Process error: {0}")]
    ProcessError(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Not a template (missing suffix {suffix:?}): {path:?}")]
    NotATemplate { path: PathBuf, suffix: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Jinja2ConfigError>;
