//! Bulk ingest of record batches
//!
//! Admission is all-or-nothing; persistence is per record.

mod bulk;
mod validation;

pub use bulk::{
    BatchResult, BulkConfig, BulkIngest, DEFAULT_CHUNK_SIZE, IngestTarget, WriteOutcome,
};
pub use validation::{
    AdmissionError, Check, RuleSet, ValidationRule, parse_number, records_from_value,
    records_from_values,
};
