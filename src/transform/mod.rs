//! Record transformers
//!
//! Concrete [`Transformer`](crate::etl::Transformer) implementations that turn
//! dashboard payloads into storage-ready rows.

mod default_filler;
mod field_mapper;
mod number_parser;
mod preparer;

pub use default_filler::DefaultFiller;
pub use field_mapper::{FieldMapper, to_snake_case};
pub use number_parser::NumberParser;
pub use preparer::RecordPreparer;
