//! NDJSON (Newline Delimited JSON) file operations

use crate::etl::{Extractor, Loader};

use eyre::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Parse NDJSON text, skipping blank lines
///
/// Line numbers in errors are 1-based and count blank lines.
pub fn parse_ndjson(content: &str) -> Result<Vec<Value>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid JSON on line {}", i + 1))
        })
        .collect()
}

/// Read NDJSON from a file
pub struct NdjsonReader {
    path: PathBuf,
}

impl NdjsonReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read all lines as JSON values
    pub fn read(&self) -> Result<Vec<Value>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read NDJSON file: {}", self.path.display()))?;
        parse_ndjson(&content)
            .with_context(|| format!("Failed to parse NDJSON file: {}", self.path.display()))
    }
}

impl Extractor for NdjsonReader {
    type Item = Value;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        self.read()
    }
}

/// Write NDJSON to a file
pub struct NdjsonWriter {
    path: PathBuf,
}

impl NdjsonWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write JSON values as NDJSON
    pub fn write(&self, items: &[Value]) -> Result<()> {
        let ndjson = items
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?
            .join("\n");

        // Add trailing newline
        let content = if ndjson.is_empty() {
            String::new()
        } else {
            format!("{}\n", ndjson)
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write NDJSON file: {}", self.path.display()))?;

        Ok(())
    }
}

impl Loader for NdjsonWriter {
    type Item = Value;
    type Report = usize;

    async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
        self.write(&items)?;
        Ok(items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_read_write() {
        let temp = NamedTempFile::new().unwrap();
        let writer = NdjsonWriter::new(temp.path());

        let data = vec![json!({"a": 1}), json!({"b": 2})];
        writer.write(&data).unwrap();

        let reader = NdjsonReader::new(temp.path());
        assert_eq!(data, reader.read().unwrap());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("exports/vendors.ndjson");
        NdjsonWriter::new(&path).write(&[json!({"a": 1})]).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{\"a\":1}\n");
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_ndjson("{\"a\":1}\n\n{oops}\n").unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
