//! Store gateway.
//!
//! The discharge workflow talks to the remote backend only through [`RecordStore`]: filtered
//! reads, filtered counts and conditional updates over JSON rows. Adapters translate [`Filter`],
//! [`Order`] and [`Patch`] into whatever the backend speaks; [`memory::InMemoryStore`] evaluates
//! them directly and backs the tests.

pub mod memory;

use serde_json::{Map, Value};

pub use memory::InMemoryStore;

/// Errors reported by store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(String),
    #[error("store rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to decode store response: {0}")]
    Decode(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// QUERY BUILDING BLOCKS
// ============================================================================

/// Comparison applied by a [`Condition`]. Range operators are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gte,
    Lte,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

/// Conjunction of field conditions. An empty filter matches every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Operator::Eq, value)
    }

    pub fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Operator::Gte, value)
    }

    pub fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Operator::Lte, value)
    }

    fn with(mut self, field: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.to_string(),
            operator,
            value: value.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

/// Sort order for [`RecordStore::select`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

impl Order {
    pub fn ascending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn descending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// Set of field assignments sent by [`RecordStore::update`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch {
    fields: Map<String, Value>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

// ============================================================================
// GATEWAY
// ============================================================================

/// Narrow gateway over the remote record store.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows of `table` matching `filter`, sorted by `order` when given.
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> StoreResult<Vec<Value>>;

    /// Number of rows of `table` matching `filter`. No rows are transferred.
    async fn count(&self, table: &str, filter: &Filter) -> StoreResult<u64>;

    /// Apply `patch` to every row of `table` matching `filter`.
    async fn update(&self, table: &str, filter: &Filter, patch: &Patch) -> StoreResult<()>;
}

#[async_trait::async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> StoreResult<Vec<Value>> {
        (**self).select(table, filter, order).await
    }

    async fn count(&self, table: &str, filter: &Filter) -> StoreResult<u64> {
        (**self).count(table, filter).await
    }

    async fn update(&self, table: &str, filter: &Filter, patch: &Patch) -> StoreResult<()> {
        (**self).update(table, filter, patch).await
    }
}
