//! Collection extractor
//!
//! Reads every row of a collection from the store, page by page.

use crate::etl::Extractor;
use crate::store::{DEFAULT_PAGE_SIZE, Filter, Store, fetch_all};

use eyre::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

/// Extractor for the rows of one store table
///
/// # Example
/// ```no_run
/// use finops_backoffice::collections::CollectionExtractor;
/// use finops_backoffice::etl::Extractor;
/// use finops_backoffice::store::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> eyre::Result<()> {
/// let extractor = CollectionExtractor::new(Arc::new(MemoryStore::new()), "vendors");
/// let rows = extractor.extract().await?;
/// # Ok(())
/// # }
/// ```
pub struct CollectionExtractor {
    store: Arc<dyn Store>,
    table: String,
    filter: Option<Filter>,
    page_size: usize,
}

impl CollectionExtractor {
    pub fn new(store: Arc<dyn Store>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            filter: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Only extract rows matching `filter`
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

impl Extractor for CollectionExtractor {
    type Item = Value;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        log::debug!("Reading all rows from {}", self.table);

        let rows = fetch_all(
            self.store.as_ref(),
            &self.table,
            self.filter.clone(),
            self.page_size,
        )
        .await
        .with_context(|| format!("Failed to read rows from {}", self.table))?;

        Ok(rows.into_iter().map(Value::Object).collect())
    }
}
