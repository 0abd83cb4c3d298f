//! Field mapper transformer
//!
//! Renames request fields (camelCase, as sent by the dashboard) to storage
//! columns (snake_case), with explicit overrides where the column name is not
//! a mechanical conversion.

use crate::etl::Transformer;
use eyre::Result;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Convert a field name to snake_case
///
/// Acronym runs stay together (`taxID` → `tax_id`, `HTTPStatus` →
/// `http_status`); spaces and hyphens become underscores.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' || c == '-' {
            if !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let after_lower = prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            let ends_acronym =
                prev.is_some_and(char::is_uppercase) && next.is_some_and(char::is_lowercase);
            if (after_lower || ends_acronym) && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Transformer that renames object keys to storage columns
///
/// # Example
/// ```
/// use finops_backoffice::transform::FieldMapper;
/// use finops_backoffice::etl::Transformer;
/// use serde_json::json;
///
/// let mapper = FieldMapper::new([("accountHolder", "account_holder_name")])
///     .with_dropped(["createdAt"]);
/// let input = json!({
///     "vendorCode": "V-1",
///     "accountHolder": "Kim",
///     "createdAt": "2024-01-01"
/// });
///
/// let output = mapper.transform(input).unwrap();
/// assert_eq!(output["vendor_code"], "V-1");
/// assert_eq!(output["account_holder_name"], "Kim");
/// assert!(output.get("created_at").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    overrides: BTreeMap<String, String>,
    dropped: Vec<String>,
}

impl FieldMapper {
    /// Create a mapper with explicit `request field → column` overrides
    pub fn new<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            overrides: overrides
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            dropped: Vec::new(),
        }
    }

    /// Fields removed before mapping (server-managed columns, UI-only state)
    pub fn with_dropped<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dropped.extend(fields.into_iter().map(|f| {
            let f: String = f.into();
            to_snake_case(&f)
        }));
        self
    }

    /// Column name for a request field
    pub fn column(&self, field: &str) -> String {
        self.overrides
            .get(field)
            .cloned()
            .unwrap_or_else(|| to_snake_case(field))
    }

    fn is_dropped(&self, field: &str) -> bool {
        let snake = to_snake_case(field);
        self.dropped
            .iter()
            .any(|d| *d == snake || *d == self.column(field))
    }

    /// Map every key of an object
    pub fn map_object(&self, input: Map<String, Value>) -> Map<String, Value> {
        input
            .into_iter()
            .filter(|(key, _)| !self.is_dropped(key))
            .map(|(key, value)| (self.column(&key), value))
            .collect()
    }
}

impl Transformer for FieldMapper {
    type Input = Value;
    type Output = Value;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(match input {
            Value::Object(map) => Value::Object(self.map_object(map)),
            other => other,
        })
    }
}
