// src/config/mod.rs

//! Tool settings for jinja2config.
//!
//! Responsibilities:
//! - Define the TOML-backed settings model (`model.rs`).
//! - Load a settings file from disk (`loader.rs`).
//! - Validate invariants such as required command placeholders (`validate.rs`).
//!
//! This is distinct from the reserved `jinja2config.yaml` inside the watched
//! root, which carries template variables and is handled by [`crate::vars`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    EntitiesSection, FormatterSection, ProcessSection, RawSettings, RendererSection, Settings,
    WatchSection,
};
