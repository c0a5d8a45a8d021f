//! # Discharge Store
//!
//! Store backends for the discharge panel and the startup logic that picks one.
//!
//! - [`rest::RestStore`] talks to a PostgREST-style managed backend over HTTP
//! - [`discharge_core::InMemoryStore`] serves local development from an optional JSON seed file
//!
//! [`StoreSettings`] is resolved once at startup and [`connect`] turns it into a
//! [`StoreBackend`], which the panel and API crates use as their concrete [`RecordStore`].

pub mod rest;

use discharge_core::store::{Filter, Order, Patch, RecordStore, StoreError, StoreResult};
use discharge_core::InMemoryStore;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use rest::{RestStore, RestStoreConfig};

/// Request timeout used when `DISCHARGE_STORE_TIMEOUT_SECS` is unset.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// SETTINGS
// ============================================================================

/// Backend settings resolved at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub timeout: Duration,
}

impl StoreSettings {
    /// Build settings from raw environment values.
    ///
    /// Blank values count as unset. Kept free of `std::env` so callers decide where values come
    /// from.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the timeout is not a positive whole number of
    /// seconds.
    pub fn from_env_values(
        url: Option<String>,
        api_key: Option<String>,
        seed_file: Option<String>,
        timeout_secs: Option<String>,
    ) -> StoreResult<Self> {
        let timeout_secs = match non_blank(timeout_secs) {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    StoreError::Unavailable(format!(
                        "DISCHARGE_STORE_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                    ))
                })?,
        };

        Ok(Self {
            url: non_blank(url),
            api_key: non_blank(api_key),
            seed_file: non_blank(seed_file).map(PathBuf::from),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Read the `DISCHARGE_STORE_*` and `DISCHARGE_SEED_FILE` variables.
    ///
    /// Call once at startup.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_env_values(
            std::env::var("DISCHARGE_STORE_URL").ok(),
            std::env::var("DISCHARGE_STORE_KEY").ok(),
            std::env::var("DISCHARGE_SEED_FILE").ok(),
            std::env::var("DISCHARGE_STORE_TIMEOUT_SECS").ok(),
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// BACKEND
// ============================================================================

/// The store the process runs against.
#[derive(Clone)]
pub enum StoreBackend {
    Memory(Arc<InMemoryStore>),
    Rest(Arc<RestStore>),
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory(_) => "memory",
            StoreBackend::Rest(_) => "rest",
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for StoreBackend {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> StoreResult<Vec<Value>> {
        match self {
            StoreBackend::Memory(store) => store.select(table, filter, order).await,
            StoreBackend::Rest(store) => store.select(table, filter, order).await,
        }
    }

    async fn count(&self, table: &str, filter: &Filter) -> StoreResult<u64> {
        match self {
            StoreBackend::Memory(store) => store.count(table, filter).await,
            StoreBackend::Rest(store) => store.count(table, filter).await,
        }
    }

    async fn update(&self, table: &str, filter: &Filter, patch: &Patch) -> StoreResult<()> {
        match self {
            StoreBackend::Memory(store) => store.update(table, filter, patch).await,
            StoreBackend::Rest(store) => store.update(table, filter, patch).await,
        }
    }
}

/// Build the backend described by `settings`.
///
/// A URL selects the HTTP backend and requires an API key. Without a URL the in-memory backend
/// is used, seeded from `seed_file` when one is given.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if a URL is given without a key or the seed file cannot be
/// read, and [`StoreError::Decode`] if the seed file is malformed.
pub fn connect(settings: &StoreSettings) -> StoreResult<StoreBackend> {
    if let Some(url) = &settings.url {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            StoreError::Unavailable(
                "DISCHARGE_STORE_KEY must be set when DISCHARGE_STORE_URL is set".into(),
            )
        })?;
        let store = RestStore::new(RestStoreConfig {
            base_url: url.clone(),
            api_key,
            timeout: settings.timeout,
        })?;
        tracing::info!(url = %url, "using remote record store");
        return Ok(StoreBackend::Rest(Arc::new(store)));
    }

    let store = match &settings.seed_file {
        Some(path) => load_seed(path)?,
        None => InMemoryStore::new(),
    };
    tracing::info!(seed = ?settings.seed_file, "using in-memory record store");
    Ok(StoreBackend::Memory(Arc::new(store)))
}

fn load_seed(path: &Path) -> StoreResult<InMemoryStore> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        StoreError::Unavailable(format!("cannot read seed file {}: {e}", path.display()))
    })?;
    InMemoryStore::from_json(&text)
}
