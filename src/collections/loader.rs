//! Bulk loader
//!
//! Loads prepared records into a collection through [`BulkIngest`].

use crate::etl::Loader;
use crate::ingest::{BatchResult, BulkConfig, BulkIngest, IngestTarget, records_from_values};
use crate::store::{ConstraintClassifier, Store};

use eyre::Result;
use serde_json::Value;
use std::sync::Arc;

/// Loader that writes a batch with chunked inserts and per-record fallback
///
/// Admission failures (empty batch, non-object item, rule violation) fail
/// the load before anything is written. Per-record store failures are
/// reported in the returned [`BatchResult`].
pub struct BulkLoader {
    store: Arc<dyn Store>,
    classifier: Arc<ConstraintClassifier>,
    target: IngestTarget,
    config: BulkConfig,
}

impl BulkLoader {
    pub fn new(
        store: Arc<dyn Store>,
        classifier: Arc<ConstraintClassifier>,
        target: IngestTarget,
    ) -> Self {
        Self {
            store,
            classifier,
            target,
            config: BulkConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BulkConfig) -> Self {
        self.config = config;
        self
    }
}

impl Loader for BulkLoader {
    type Item = Value;
    type Report = BatchResult;

    async fn load(&self, items: Vec<Self::Item>) -> Result<BatchResult> {
        let records = records_from_values(items)
            .map_err(|e| eyre::eyre!("Rejected batch for {}: {}", self.target.collection, e))?;

        BulkIngest::new(self.store.as_ref(), &self.classifier)
            .with_config(self.config)
            .run(&self.target, records)
            .await
            .map_err(|e| eyre::eyre!("Rejected batch for {}: {}", self.target.collection, e))
    }
}
