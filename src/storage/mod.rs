//! File system storage operations
//!
//! This module handles record file I/O:
//! - JSON array / NDJSON record files for imports
//! - NDJSON writing for exports

mod ndjson;
mod records_file;

pub use ndjson::{NdjsonReader, NdjsonWriter, parse_ndjson};
pub use records_file::{RecordFileReader, parse_records};
