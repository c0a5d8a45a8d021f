//! HTTP adapter for a PostgREST-style managed backend.
//!
//! Each table is served at `{base_url}/rest/v1/{table}`. Filters become query parameters of the
//! form `field=op.value`, ordering becomes `order=field.desc.nullslast`, counts use `HEAD` with
//! `Prefer: count=exact` and read the total from `Content-Range`, and updates use `PATCH` with
//! `Prefer: return=minimal`.

use discharge_core::store::{Filter, Order, Patch, RecordStore, StoreError, StoreResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use serde_json::Value;
use std::time::Duration;

/// Connection settings for [`RestStore`].
#[derive(Clone, Debug)]
pub struct RestStoreConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

pub struct RestStore {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl RestStore {
    /// Builds a client that sends the API key on every request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] if the key is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(cfg: RestStoreConfig) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&cfg.api_key)
            .map_err(|e| StoreError::Transport(format!("invalid API key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", cfg.api_key))
            .map_err(|e| StoreError::Transport(format!("invalid API key: {e}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client,
            timeout: cfg.timeout,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn transport_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_connect() {
            StoreError::Transport(format!("cannot reach store at {}", self.base_url))
        } else if e.is_timeout() {
            StoreError::Transport(format!(
                "request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            StoreError::Transport(e.to_string())
        }
    }

    async fn ensure_success(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait::async_trait]
impl RecordStore for RestStore {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> StoreResult<Vec<Value>> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(filter_pairs(filter));
        if let Some(order) = order {
            query.push(order_pair(order));
        }

        tracing::debug!(table, "store select");
        let response = self
            .client
            .get(self.table_url(table))
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::ensure_success(response).await?;

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn count(&self, table: &str, filter: &Filter) -> StoreResult<u64> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(filter_pairs(filter));

        tracing::debug!(table, "store count");
        let response = self
            .client
            .head(self.table_url(table))
            .query(&query)
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::ensure_success(response).await?;

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::Decode("missing Content-Range header".into()))?;

        parse_content_range_total(range)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: &Patch) -> StoreResult<()> {
        if filter.conditions().is_empty() {
            return Err(StoreError::Rejected {
                status: 400,
                body: "refusing to update without a filter".into(),
            });
        }

        tracing::debug!(table, "store update");
        let response = self
            .client
            .patch(self.table_url(table))
            .query(&filter_pairs(filter))
            .header("Prefer", "return=minimal")
            .json(&patch.fields())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::ensure_success(response).await?;

        Ok(())
    }
}

// ============================================================================
// QUERY ENCODING
// ============================================================================

/// Encodes each condition as `(field, "op.value")`.
pub fn filter_pairs(filter: &Filter) -> Vec<(String, String)> {
    filter
        .conditions()
        .iter()
        .map(|c| {
            (
                c.field.clone(),
                format!("{}.{}", c.operator.as_str(), scalar_text(&c.value)),
            )
        })
        .collect()
}

/// Encodes `order` as `(order, "field.dir.nullslast")`.
///
/// Rows missing the field sort last in both directions, matching the in-memory store.
pub fn order_pair(order: &Order) -> (String, String) {
    let direction = if order.descending { "desc" } else { "asc" };
    (
        "order".to_string(),
        format!("{}.{}.nullslast", order.field, direction),
    )
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads the total from a `Content-Range` value such as `0-24/573` or `*/0`.
pub fn parse_content_range_total(range: &str) -> StoreResult<u64> {
    let total = range
        .rsplit_once('/')
        .map(|(_, total)| total.trim())
        .ok_or_else(|| StoreError::Decode(format!("malformed Content-Range: {range}")))?;

    total
        .parse::<u64>()
        .map_err(|_| StoreError::Decode(format!("Content-Range has no exact total: {range}")))
}
