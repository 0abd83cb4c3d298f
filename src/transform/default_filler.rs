//! Default value transformer
//!
//! Fills fields the caller left out, e.g. the currency on income rows.

use crate::etl::Transformer;
use eyre::Result;
use serde_json::{Map, Value};

/// Transformer that fills absent or null fields with fixed values
///
/// # Example
/// ```
/// use finops_backoffice::transform::DefaultFiller;
/// use finops_backoffice::etl::Transformer;
/// use serde_json::json;
///
/// let filler = DefaultFiller::new([("currency", json!("KRW"))]);
///
/// let output = filler.transform(json!({"amount": 1000})).unwrap();
/// assert_eq!(output["currency"], "KRW");
///
/// let output = filler.transform(json!({"amount": 5, "currency": "USD"})).unwrap();
/// assert_eq!(output["currency"], "USD");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultFiller {
    defaults: Map<String, Value>,
}

impl DefaultFiller {
    pub fn new<I, K>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            defaults: defaults.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }

    /// Fill `target` in place
    pub fn fill(&self, target: &mut Map<String, Value>) {
        for (key, value) in &self.defaults {
            match target.get(key) {
                Some(existing) if !existing.is_null() => {}
                _ => {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

impl Transformer for DefaultFiller {
    type Input = Value;
    type Output = Value;

    fn transform(&self, mut input: Self::Input) -> Result<Self::Output> {
        if let Some(obj) = input.as_object_mut() {
            self.fill(obj);
        }
        Ok(input)
    }
}
