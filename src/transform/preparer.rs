//! Request-to-storage record preparation

use super::{DefaultFiller, FieldMapper, NumberParser};
use crate::etl::Transformer;
use eyre::Result;
use serde_json::Value;

/// Maps field names, fills defaults, then parses numeric columns
///
/// Records leaving the preparer are storage-ready and can go straight to a
/// [`Store`](crate::store::Store) or a bulk ingest.
#[derive(Debug, Clone, Default)]
pub struct RecordPreparer {
    mapper: FieldMapper,
    defaults: DefaultFiller,
    numbers: NumberParser,
}

impl RecordPreparer {
    pub fn new(mapper: FieldMapper, defaults: DefaultFiller) -> Self {
        Self {
            mapper,
            defaults,
            numbers: NumberParser::default(),
        }
    }

    pub fn with_numbers(mut self, numbers: NumberParser) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    /// Field mapping only; used for partial updates where defaults must not
    /// overwrite columns the caller did not touch
    pub fn map_only(&self, input: Value) -> Result<Value> {
        let mapped = self.mapper.transform(input)?;
        self.numbers.transform(mapped)
    }

    /// Map, fill from `batch`, then apply the collection defaults
    ///
    /// Batch values are the scalar fields sent alongside a bulk request's
    /// records; they take precedence over collection defaults.
    pub fn transform_with(&self, input: Value, batch: &DefaultFiller) -> Result<Value> {
        let mapped = self.mapper.transform(input)?;
        let filled = batch.transform(mapped)?;
        let defaulted = self.defaults.transform(filled)?;
        self.numbers.transform(defaulted)
    }
}

impl Transformer for RecordPreparer {
    type Input = Value;
    type Output = Value;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        let mapped = self.mapper.transform(input)?;
        let defaulted = self.defaults.transform(mapped)?;
        self.numbers.transform(defaulted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn preparer() -> RecordPreparer {
        RecordPreparer::new(
            FieldMapper::default(),
            DefaultFiller::new([("currency", json!("KRW"))]),
        )
    }

    #[test]
    fn test_defaults_apply_after_mapping() {
        let output = preparer()
            .transform(json!({"orderNumber": "O-1", "Currency": null}))
            .unwrap();
        assert_eq!(output, json!({"order_number": "O-1", "currency": "KRW"}));
    }

    #[test]
    fn test_map_only_skips_defaults() {
        let output = preparer().map_only(json!({"orderNumber": "O-1"})).unwrap();
        assert_eq!(output, json!({"order_number": "O-1"}));
    }

    #[test]
    fn test_numeric_columns_are_parsed() {
        let preparer = preparer().with_numbers(NumberParser::new(["amount"]));
        let output = preparer
            .transform(json!({"orderNumber": "O-1", "amount": "1,200"}))
            .unwrap();
        assert_eq!(output["amount"], 1200);

        let output = preparer.map_only(json!({"amount": "3.5"})).unwrap();
        assert_eq!(output, json!({"amount": 3.5}));

        let output = preparer
            .transform_with(json!({}), &DefaultFiller::new([("amount", json!("2,000"))]))
            .unwrap();
        assert_eq!(output["amount"], 2000);
    }

    #[test]
    fn test_batch_values_before_defaults() {
        let batch = DefaultFiller::new([
            ("currency", json!("USD")),
            ("brand_code", json!("B01")),
        ]);
        let output = preparer()
            .transform_with(json!({"orderNumber": "O-1", "brandCode": "B02"}), &batch)
            .unwrap();
        assert_eq!(
            output,
            json!({"order_number": "O-1", "brand_code": "B02", "currency": "USD"})
        );
    }
}
