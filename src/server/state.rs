use std::sync::Arc;

use crate::collections::{CollectionCatalog, CollectionSpec};
use crate::ingest::BulkConfig;
use crate::store::{ConstraintClassifier, DEFAULT_PAGE_SIZE, Store, StoreError};

use super::error::ApiError;

/// Shared handles for every request
///
/// Built once at start-up; handlers receive a clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub catalog: Arc<CollectionCatalog>,
    pub classifier: Arc<ConstraintClassifier>,
    pub bulk: BulkConfig,
    pub page_size: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, catalog: CollectionCatalog) -> Self {
        Self {
            store,
            catalog: Arc::new(catalog),
            classifier: Arc::new(ConstraintClassifier::default()),
            bulk: BulkConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_classifier(mut self, classifier: ConstraintClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_bulk_config(mut self, bulk: BulkConfig) -> Self {
        self.bulk = bulk;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn collection(&self, name: &str) -> Result<&CollectionSpec, ApiError> {
        self.catalog
            .get(name)
            .ok_or_else(|| ApiError::NotFound(format!("unknown collection: {name}")))
    }

    /// Error for a failed single-record write
    pub fn write_error(&self, identifier: &str, error: StoreError) -> ApiError {
        if self.classifier.is_unique_violation(&error) {
            ApiError::Conflict(self.classifier.describe(identifier, &error))
        } else {
            ApiError::Store(error)
        }
    }
}
