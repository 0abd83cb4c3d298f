//! Record files for import
//!
//! Accepts either a JSON array (`[{...}, {...}]`) or NDJSON (one object per
//! line). The format is detected from the first non-whitespace character.

use super::ndjson::parse_ndjson;
use crate::etl::Extractor;
use eyre::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Extractor for a JSON or NDJSON record file
pub struct RecordFileReader {
    path: PathBuf,
}

impl RecordFileReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in the file
    ///
    /// A JSON file holding an object with a `records` array is also accepted,
    /// which matches the bulk endpoint's request body.
    pub fn read(&self) -> Result<Vec<Value>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read record file: {}", self.path.display()))?;
        parse_records(&content)
            .with_context(|| format!("Failed to parse record file: {}", self.path.display()))
    }
}

/// Parse file content into JSON values
pub fn parse_records(content: &str) -> Result<Vec<Value>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let value: Value = serde_json::from_str(trimmed)?;
        return match value {
            Value::Array(items) => Ok(items),
            _ => eyre::bail!("Expected a JSON array"),
        };
    }

    // A whole bulk request body: {"records": [...]}
    if let Ok(Value::Object(mut body)) = serde_json::from_str::<Value>(trimmed) {
        if let Some(Value::Array(items)) = body.remove("records") {
            return Ok(items);
        }
        return Ok(vec![Value::Object(body)]);
    }

    parse_ndjson(content)
}

impl Extractor for RecordFileReader {
    type Item = Value;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        let values = self.read()?;
        log::debug!(
            "Read {} record(s) from {}",
            values.len(),
            self.path.display()
        );
        Ok(values)
    }
}
