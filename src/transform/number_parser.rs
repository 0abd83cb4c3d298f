//! Numeric column transformer
//!
//! Dashboards send amounts as formatted text (`"1,200"`). Numeric columns
//! only accept JSON numbers, so those strings are converted before writing.

use crate::etl::Transformer;
use crate::ingest::parse_number;
use eyre::Result;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Transformer that turns numeric strings in the listed columns into numbers
///
/// Strings that do not parse are left alone for validation to reject.
///
/// # Example
/// ```
/// use finops_backoffice::transform::NumberParser;
/// use finops_backoffice::etl::Transformer;
/// use serde_json::json;
///
/// let parser = NumberParser::new(["amount"]);
///
/// let output = parser.transform(json!({"amount": "1,200", "memo": "12"})).unwrap();
/// assert_eq!(output, json!({"amount": 1200, "memo": "12"}));
/// ```
#[derive(Debug, Clone, Default)]
pub struct NumberParser {
    columns: BTreeSet<String>,
}

impl NumberParser {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Convert the listed columns of `target` in place
    pub fn parse(&self, target: &mut Map<String, Value>) {
        for column in &self.columns {
            let parsed = match target.get(column) {
                Some(Value::String(text)) => parse_number(text),
                _ => None,
            };
            if let Some(number) = parsed {
                target.insert(column.clone(), Value::Number(number));
            }
        }
    }
}

impl Transformer for NumberParser {
    type Input = Value;
    type Output = Value;

    fn transform(&self, mut input: Self::Input) -> Result<Self::Output> {
        if let Some(obj) = input.as_object_mut() {
            self.parse(obj);
        }
        Ok(input)
    }
}
