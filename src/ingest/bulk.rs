//! Bulk insert with per-record fallback
//!
//! A batch is written in fixed-size chunks. A chunk that the store accepts
//! in one `insert_many` is done. A chunk that fails is retried one record at
//! a time, so a single bad row costs only that row. Nothing is retried more
//! than once: bulk, then singleton, then the record is settled.

use super::validation::{AdmissionError, RuleSet};
use crate::store::{ConstraintClassifier, Record, Store, value_text};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};

/// Records per `insert_many` call
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Tuning for [`BulkIngest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkConfig {
    pub chunk_size: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl BulkConfig {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

/// Final state of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed,
    Rejected(String),
}

/// Aggregate of a whole batch
///
/// Serialises as `{"success": N, "failed": M, "errors": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(rename = "success")]
    pub success_count: usize,
    #[serde(rename = "failed")]
    pub failed_count: usize,
    pub errors: Vec<String>,
}

impl BatchResult {
    pub fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Committed => self.success_count += 1,
            WriteOutcome::Rejected(reason) => {
                self.failed_count += 1;
                self.errors.push(reason);
            }
        }
    }

    /// Number of records settled so far
    pub fn total(&self) -> usize {
        self.success_count + self.failed_count
    }

    pub fn is_clean(&self) -> bool {
        self.failed_count == 0
    }
}

/// Where a batch goes and what it must satisfy
#[derive(Debug, Clone)]
pub struct IngestTarget {
    /// Table name in the store
    pub collection: String,
    /// Field used to tag failure messages; falls back to the row number
    pub key_field: Option<String>,
    pub rules: RuleSet,
}

impl IngestTarget {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key_field: None,
            rules: RuleSet::default(),
        }
    }

    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = Some(field.into());
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Identifier used in failure messages for the record at `index` (0-based)
    pub fn identify(&self, index: usize, record: &Record) -> String {
        self.key_field
            .as_ref()
            .and_then(|field| record.get(field))
            .filter(|value| !value.is_null())
            .map(value_text)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| format!("row {}", index + 1))
    }
}

/// The bulk ingest operation
///
/// # Example
/// ```
/// use finops_backoffice::ingest::{BulkIngest, IngestTarget};
/// use finops_backoffice::store::{ConstraintClassifier, MemoryStore};
/// use serde_json::json;
///
/// # async fn example() -> eyre::Result<()> {
/// let store = MemoryStore::new().with_unique("vendors", ["vendor_code"]);
/// let classifier = ConstraintClassifier::default();
/// let target = IngestTarget::new("vendors").with_key_field("vendor_code");
///
/// let records = vec![
///     json!({"vendor_code": "V-1"}).as_object().cloned().unwrap(),
///     json!({"vendor_code": "V-1"}).as_object().cloned().unwrap(),
/// ];
/// let result = BulkIngest::new(&store, &classifier).run(&target, records).await?;
///
/// assert_eq!(result.success_count, 1);
/// assert_eq!(result.errors, vec!["V-1: already exists"]);
/// # Ok(())
/// # }
/// ```
pub struct BulkIngest<'a, S: Store + ?Sized> {
    store: &'a S,
    classifier: &'a ConstraintClassifier,
    config: BulkConfig,
}

impl<'a, S: Store + ?Sized> BulkIngest<'a, S> {
    pub fn new(store: &'a S, classifier: &'a ConstraintClassifier) -> Self {
        Self {
            store,
            classifier,
            config: BulkConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BulkConfig) -> Self {
        self.config = config;
        self
    }

    /// Admit and write a batch
    ///
    /// # Errors
    /// Only admission failures are returned as errors, and only before any
    /// write. Store failures land in [`BatchResult::errors`].
    pub async fn run(
        &self,
        target: &IngestTarget,
        records: Vec<Record>,
    ) -> Result<BatchResult, AdmissionError> {
        target.rules.admit(&records)?;

        let chunk_size = self.config.chunk_size.max(1);
        log::debug!(
            "Ingesting {} record(s) into {} in chunks of {}",
            records.len(),
            target.collection,
            chunk_size
        );

        let mut result = BatchResult::default();
        for (chunk_index, chunk) in records.chunks(chunk_size).enumerate() {
            let offset = chunk_index * chunk_size;
            self.write_chunk(target, offset, chunk, &mut result).await;
        }

        if result.is_clean() {
            log::info!(
                "Inserted {} record(s) into {}",
                result.success_count,
                target.collection.cyan()
            );
        } else {
            log::warn!(
                "Inserted {} record(s) into {}, {} failed",
                result.success_count,
                target.collection.cyan(),
                result.failed_count.red()
            );
        }
        Ok(result)
    }

    async fn write_chunk(
        &self,
        target: &IngestTarget,
        offset: usize,
        chunk: &[Record],
        result: &mut BatchResult,
    ) {
        match self.store.insert_many(&target.collection, chunk).await {
            Ok(()) => {
                log::debug!(
                    "Chunk at row {} committed ({} record(s))",
                    offset + 1,
                    chunk.len()
                );
                result.success_count += chunk.len();
            }
            Err(e) => {
                log::warn!(
                    "Bulk insert of rows {}-{} into {} failed ({}), retrying one by one",
                    offset + 1,
                    offset + chunk.len(),
                    target.collection,
                    e
                );
                for (i, record) in chunk.iter().enumerate() {
                    let outcome = self.write_one(target, offset + i, record).await;
                    result.record(outcome);
                }
            }
        }
    }

    async fn write_one(&self, target: &IngestTarget, index: usize, record: &Record) -> WriteOutcome {
        match self.store.insert_one(&target.collection, record).await {
            Ok(_) => WriteOutcome::Committed,
            Err(e) => {
                let reason = self.classifier.describe(&target.identify(index, record), &e);
                log::debug!("Rejected {}", reason);
                WriteOutcome::Rejected(reason)
            }
        }
    }
}
