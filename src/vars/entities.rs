// src/vars/entities.rs

//! Optional remote entity-state snapshot injected into every context.
//!
//! The store talks to an [`EntitySource`] instead of an HTTP client directly,
//! so tests can swap in a static source.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::EntitiesSection;
use crate::errors::{Jinja2ConfigError, Result};

/// Field identifying an entity inside each `/states` element.
pub const ENTITY_ID_FIELD: &str = "entity_id";

/// Entity id -> full state object.
pub type EntitySnapshot = Map<String, Value>;

pub type EntityFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<EntitySnapshot>>> + Send + 'a>>;

/// Where entity snapshots come from.
///
/// `Ok(None)` means "no snapshot by configuration"; `Err` means the source
/// was expected to answer and did not. Both leave the snapshot absent.
pub trait EntitySource: Send + Sync {
    fn fetch(&self) -> EntityFuture<'_>;
}

/// Source used when entity injection is turned off.
#[derive(Debug, Clone, Default)]
pub struct DisabledEntitySource;

impl EntitySource for DisabledEntitySource {
    fn fetch(&self) -> EntityFuture<'_> {
        Box::pin(async { Ok(None) })
    }
}

/// `GET {base_url}/states` with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpEntitySource {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpEntitySource {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Jinja2ConfigError::EntityFetch(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }

    /// Build from settings, reading the token from the configured environment
    /// variable.
    pub fn from_settings(section: &EntitiesSection) -> Result<Self> {
        let token = std::env::var(&section.token_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            debug!(env = %section.token_env, "entity API token not set");
        }
        Self::new(
            section.base_url.clone(),
            token,
            Duration::from_secs(section.request_timeout_secs),
        )
    }

    fn states_url(&self) -> String {
        format!("{}/states", self.base_url.trim_end_matches('/'))
    }

    async fn fetch_states(&self) -> Result<Option<EntitySnapshot>> {
        let url = self.states_url();
        let token = self.token.as_deref().ok_or_else(|| {
            Jinja2ConfigError::EntityFetch(format!("no API token available for {url}"))
        })?;

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Jinja2ConfigError::EntityFetch(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Jinja2ConfigError::EntityFetch(format!(
                "{url} returned {status}"
            )));
        }

        let states: Vec<Value> = response.json().await.map_err(|e| {
            Jinja2ConfigError::EntityFetch(format!("failed to parse states from {url}: {e}"))
        })?;

        let snapshot = snapshot_from_states(states);
        debug!(entities = snapshot.len(), "fetched entity snapshot");
        Ok(Some(snapshot))
    }
}

impl EntitySource for HttpEntitySource {
    fn fetch(&self) -> EntityFuture<'_> {
        Box::pin(self.fetch_states())
    }
}

/// Index state objects by their `entity_id`. Elements without a string id are
/// dropped.
pub fn snapshot_from_states(states: Vec<Value>) -> EntitySnapshot {
    let mut snapshot = Map::new();
    for state in states {
        let id = match state.get(ENTITY_ID_FIELD).and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => continue,
        };
        snapshot.insert(id, state);
    }
    snapshot
}
