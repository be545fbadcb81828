// src/watch/mod.rs

//! File watching and template discovery.
//!
//! This module is responsible for:
//! - Walking the root for template files (initial build, full rebuilds).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Translating raw notify events into queued changes, or into a variable
//!   reload when the reserved config file changes.
//!
//! It does **not** compile anything; it only fills the change queue.

pub mod event_handler;
pub mod path_utils;
pub mod scan;
pub mod watcher;

pub use event_handler::{rebuild_all, translate_event, TemplateMatcher, WatchAction};
pub use scan::{collect_templates, queue_templates};
pub use watcher::{spawn_watcher, WatchContext, WatcherHandle};
