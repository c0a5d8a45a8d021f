//! In-memory [`RecordStore`].
//!
//! Rows are kept as JSON objects per table and filters are evaluated the way the remote backend
//! evaluates them: equality on JSON values, inclusive ranges on numbers, RFC 3339 timestamps or
//! plain strings, and a missing or null field never matching. Used for local development and as
//! the fake backend in tests, with per-operation failure injection and a log of updates.

use super::{Condition, Filter, Operator, Order, Patch, RecordStore, StoreError, StoreResult};
use crate::constants::{ADMISSIONS_TABLE, CONSULTATIONS_TABLE};
use chrono::DateTime;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Store operation, used to target failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Select,
    Count,
    Update,
}

/// An update the store received, kept for inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedUpdate {
    pub table: String,
    pub filter: Filter,
    pub patch: Patch,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Value>>,
    failures: HashSet<(StoreOperation, String)>,
    updates: Vec<RecordedUpdate>,
}

#[derive(serde::Deserialize)]
struct SeedFile {
    #[serde(default)]
    admissions: Vec<Value>,
    #[serde(default)]
    consultations: Vec<Value>,
}

pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store with the admissions and consultations tables.
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        state.tables.insert(ADMISSIONS_TABLE.to_string(), Vec::new());
        state
            .tables
            .insert(CONSULTATIONS_TABLE.to_string(), Vec::new());
        Self {
            state: Mutex::new(state),
        }
    }

    /// Creates a store seeded from a JSON document `{"admissions": [..], "consultations": [..]}`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if the document is not valid JSON of that shape.
    pub fn from_json(json_text: &str) -> StoreResult<Self> {
        let seed: SeedFile =
            serde_json::from_str(json_text).map_err(|e| StoreError::Decode(e.to_string()))?;

        let store = Self::new();
        for row in seed.admissions {
            store.insert(ADMISSIONS_TABLE, row);
        }
        for row in seed.consultations {
            store.insert(CONSULTATIONS_TABLE, row);
        }
        Ok(store)
    }

    /// Appends a row to `table`, creating the table if needed.
    pub fn insert(&self, table: &str, row: Value) {
        self.lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    /// Makes every `operation` on `table` fail until [`clear_failures`](Self::clear_failures).
    pub fn fail(&self, operation: StoreOperation, table: &str) {
        self.lock().failures.insert((operation, table.to_string()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Updates received so far, in arrival order. Failed updates are not recorded.
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.lock().updates.clone()
    }

    /// Current rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_failure(
        state: &MemoryState,
        operation: StoreOperation,
        table: &str,
    ) -> StoreResult<()> {
        if state.failures.contains(&(operation, table.to_string())) {
            return Err(StoreError::Unavailable(format!(
                "injected {operation:?} failure on {table}"
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryStore {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> StoreResult<Vec<Value>> {
        let state = self.lock();
        Self::check_failure(&state, StoreOperation::Select, table)?;

        let rows = state
            .tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let mut selected: Vec<Value> = rows
            .iter()
            .filter(|row| row_matches(row, filter))
            .cloned()
            .collect();

        if let Some(order) = order {
            selected.sort_by(|a, b| compare_for_order(a, b, order));
        }

        tracing::debug!(table, rows = selected.len(), "in-memory select");
        Ok(selected)
    }

    async fn count(&self, table: &str, filter: &Filter) -> StoreResult<u64> {
        let state = self.lock();
        Self::check_failure(&state, StoreOperation::Count, table)?;

        let rows = state
            .tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        Ok(rows.iter().filter(|row| row_matches(row, filter)).count() as u64)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: &Patch) -> StoreResult<()> {
        let mut state = self.lock();
        Self::check_failure(&state, StoreOperation::Update, table)?;

        let rows = state
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let mut touched = 0usize;
        for row in rows.iter_mut().filter(|row| row_matches(row, filter)) {
            if let Value::Object(fields) = row {
                for (key, value) in patch.fields() {
                    fields.insert(key.clone(), value.clone());
                }
                touched += 1;
            }
        }

        tracing::debug!(table, rows = touched, "in-memory update");
        state.updates.push(RecordedUpdate {
            table: table.to_string(),
            filter: filter.clone(),
            patch: patch.clone(),
        });
        Ok(())
    }
}

// ============================================================================
// FILTER EVALUATION
// ============================================================================

fn row_matches(row: &Value, filter: &Filter) -> bool {
    filter
        .conditions()
        .iter()
        .all(|condition| condition_matches(row, condition))
}

fn condition_matches(row: &Value, condition: &Condition) -> bool {
    let field = match row.get(&condition.field) {
        Some(Value::Null) | None => return false,
        Some(value) => value,
    };

    match condition.operator {
        Operator::Eq => field == &condition.value,
        Operator::Gte => matches!(
            compare_values(field, &condition.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lte => matches!(
            compare_values(field, &condition.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

/// Orders two JSON scalars. Strings that both parse as RFC 3339 compare as instants, so
/// timestamps written with different offsets still order correctly.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Missing and null values sort last in either direction.
fn compare_for_order(a: &Value, b: &Value, order: &Order) -> Ordering {
    let a = a.get(&order.field).filter(|v| !v.is_null());
    let b = b.get(&order.field).filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b).unwrap_or(Ordering::Equal);
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}
