// src/vars/mod.rs

//! Template variables.
//!
//! - [`global`] parses the reserved `jinja2config.yaml` into base variables,
//!   per-file overrides and a skip-list.
//! - [`entities`] fetches the optional remote entity snapshot.
//! - [`merge`] implements the recursive deep-merge.
//! - [`skip`] is the skip policy.
//! - [`store`] caches all of the above behind copy-on-write snapshots.

pub mod entities;
pub mod global;
pub mod merge;
pub mod skip;
pub mod store;

pub use entities::{
    DisabledEntitySource, EntityFuture, EntitySnapshot, EntitySource, HttpEntitySource,
};
pub use global::{GlobalConfig, GLOBAL_CONFIG_FILE, OVERRIDES_KEY, SKIP_KEY};
pub use merge::{deep_merge, deep_merge_maps};
pub use skip::SkipPolicy;
pub use store::{VariableContext, VariableSnapshot, VariableStore, ENTITIES_KEY};
