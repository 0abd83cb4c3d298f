//! Batch admission rules
//!
//! Rules run against every record before any write is attempted. The first
//! violation rejects the whole batch.

use crate::store::Record;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

/// Request-level failure: the batch is refused before any store call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdmissionError {
    #[error("records must be a list")]
    NotAList,

    #[error("records must not be empty")]
    EmptyBatch,

    #[error("row {row}: record must be an object")]
    NotAnObject { row: usize },

    #[error("row {row}: {field} {reason}")]
    Invalid {
        row: usize,
        field: String,
        reason: String,
    },
}

/// What a rule checks
///
/// `Required` and `NonEmptyString` fail on an absent field; `Number` and
/// `Pattern` only inspect a field that is present and non-null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Present, not null, and not blank when a string
    Required,
    /// A string with at least one non-whitespace character
    NonEmptyString,
    /// A JSON number or a string that parses as one
    Number,
    /// A string matching the regular expression
    Pattern { pattern: String },
}

/// A check bound to one field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationRule {
    pub field: String,
    #[serde(flatten)]
    pub check: Check,
}

impl ValidationRule {
    pub fn required(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            check: Check::Required,
        }
    }

    pub fn non_empty_string(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            check: Check::NonEmptyString,
        }
    }

    pub fn number(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            check: Check::Number,
        }
    }

    pub fn pattern(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            check: Check::Pattern {
                pattern: pattern.into(),
            },
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Parse a numeric string such as `"1,200"` or `" 12.5 "` into a JSON number
///
/// Thousands separators are dropped. Integers stay integers. Non-finite
/// values (`NaN`, `inf`) are not numbers.
pub fn parse_number(text: &str) -> Option<Number> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(n) = cleaned.parse::<i64>() {
        return Some(Number::from(n));
    }
    if !cleaned.bytes().all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b)) {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .and_then(Number::from_f64)
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => parse_number(s).is_some(),
        _ => false,
    }
}

/// Compiled set of rules for one collection
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(ValidationRule, Option<Regex>)>,
}

impl RuleSet {
    /// Compile `rules`, failing on an invalid pattern
    pub fn compile(rules: &[ValidationRule]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| {
                let regex = match &rule.check {
                    Check::Pattern { pattern } => Some(Regex::new(pattern)?),
                    _ => None,
                };
                Ok((rule.clone(), regex))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check one record; `row` is the 1-based position used in the error
    pub fn check(&self, row: usize, record: &Record) -> Result<(), AdmissionError> {
        for (rule, regex) in &self.rules {
            let value = record.get(&rule.field);
            let reason = match (&rule.check, value) {
                (Check::Required, None) => Some("is required".to_string()),
                (Check::Required, Some(v)) if is_blank(v) => Some("is required".to_string()),
                (Check::NonEmptyString, Some(Value::String(s))) if !s.trim().is_empty() => None,
                (Check::NonEmptyString, _) => Some("must be a non-empty string".to_string()),
                (Check::Number, Some(v)) if !v.is_null() && !is_numeric(v) => {
                    Some("must be a number".to_string())
                }
                (Check::Pattern { pattern }, Some(v)) if !v.is_null() => {
                    let matched = match (v, regex) {
                        (Value::String(s), Some(re)) => re.is_match(s),
                        _ => false,
                    };
                    (!matched).then(|| format!("does not match pattern {}", pattern))
                }
                _ => None,
            };

            if let Some(reason) = reason {
                return Err(AdmissionError::Invalid {
                    row,
                    field: rule.field.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Check every record, reporting the first violation
    pub fn admit(&self, records: &[Record]) -> Result<(), AdmissionError> {
        if records.is_empty() {
            return Err(AdmissionError::EmptyBatch);
        }
        records
            .iter()
            .enumerate()
            .try_for_each(|(i, record)| self.check(i + 1, record))
    }
}

/// Convert a raw JSON payload into records
///
/// The payload must be a non-empty array of objects.
pub fn records_from_value(value: Value) -> Result<Vec<Record>, AdmissionError> {
    let Value::Array(items) = value else {
        return Err(AdmissionError::NotAList);
    };
    records_from_values(items)
}

/// Convert a list of JSON values into records
pub fn records_from_values(items: Vec<Value>) -> Result<Vec<Record>, AdmissionError> {
    if items.is_empty() {
        return Err(AdmissionError::EmptyBatch);
    }
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(AdmissionError::NotAnObject { row: i + 1 }),
        })
        .collect()
}
