//! Record store abstraction
//!
//! Every collection lives behind the [`Store`] trait. Two implementations ship:
//! - [`PostgrestClient`](crate::client::PostgrestClient) for the managed database
//! - [`MemoryStore`] for local runs and tests

mod classify;
mod error;
mod memory;
mod paginate;

pub use classify::{ConstraintClassifier, DEFAULT_DUPLICATE_MESSAGE, DEFAULT_UNIQUE_CODES};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use paginate::{DEFAULT_PAGE_SIZE, fetch_all};

use async_trait::async_trait;
use serde_json::{Map, Value};

/// A single storage-ready row: column name to JSON value
pub type Record = Map<String, Value>;

/// Equality filter on one column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Whether `record` satisfies this filter.
    ///
    /// Strings and numbers compare by their textual form so that a path
    /// segment like `"42"` matches a numeric id.
    pub fn matches(&self, record: &Record) -> bool {
        match record.get(&self.column) {
            Some(found) => found == &self.value || value_text(found) == value_text(&self.value),
            None => false,
        }
    }
}

/// Text form of a scalar value, used for loose comparisons and query strings
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// One page of a select
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    pub filter: Option<Filter>,
    pub order_by: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

impl PageQuery {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_order(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }
}

/// Relational-table-like store used by every collection
///
/// All methods report failures as [`StoreError`] values. A bulk insert is
/// expected to be all-or-nothing: when it fails, none of its rows persist.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert every record in one write
    async fn insert_many(&self, collection: &str, records: &[Record]) -> Result<(), StoreError>;

    /// Insert a single record, returning the stored row
    async fn insert_one(&self, collection: &str, record: &Record) -> Result<Record, StoreError>;

    /// Read one page of rows
    async fn select_page(
        &self,
        collection: &str,
        query: &PageQuery,
    ) -> Result<Vec<Record>, StoreError>;

    /// Patch every row matching `filter`, returning the updated rows
    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Record,
    ) -> Result<Vec<Record>, StoreError>;

    /// Delete every row matching `filter`, returning how many were removed
    async fn delete(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}
