//! Translation of store errors into domain messages

use super::StoreError;
use std::collections::BTreeSet;

/// Postgres `unique_violation`
pub const DEFAULT_UNIQUE_CODES: &[&str] = &["23505"];

pub const DEFAULT_DUPLICATE_MESSAGE: &str = "already exists";

/// Decides which store errors mean "this row is a duplicate"
///
/// The codes are configuration: a different backend reports uniqueness
/// violations with its own code, so callers load them from settings instead
/// of assuming the Postgres one.
///
/// # Example
/// ```
/// use finops_backoffice::store::{ConstraintClassifier, StoreError};
///
/// let classifier = ConstraintClassifier::default();
/// let dup = StoreError::rejected("23505", "duplicate key value violates unique constraint");
/// assert_eq!(classifier.describe("V-001", &dup), "V-001: already exists");
///
/// let other = StoreError::rejected("22P02", "invalid input syntax for type numeric");
/// assert_eq!(
///     classifier.describe("V-002", &other),
///     "V-002: invalid input syntax for type numeric"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintClassifier {
    unique_codes: BTreeSet<String>,
    duplicate_message: String,
}

impl Default for ConstraintClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_UNIQUE_CODES.iter().copied())
    }
}

impl ConstraintClassifier {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique_codes: codes.into_iter().map(Into::into).collect(),
            duplicate_message: DEFAULT_DUPLICATE_MESSAGE.to_string(),
        }
    }

    /// Override the message used for duplicates
    pub fn with_duplicate_message(mut self, message: impl Into<String>) -> Self {
        self.duplicate_message = message.into();
        self
    }

    pub fn unique_codes(&self) -> impl Iterator<Item = &str> {
        self.unique_codes.iter().map(String::as_str)
    }

    pub fn duplicate_message(&self) -> &str {
        &self.duplicate_message
    }

    pub fn is_unique_violation(&self, error: &StoreError) -> bool {
        error
            .code()
            .is_some_and(|code| self.unique_codes.contains(code))
    }

    /// Domain message for `error`, without an identifier prefix
    pub fn reason(&self, error: &StoreError) -> String {
        if self.is_unique_violation(error) {
            self.duplicate_message.clone()
        } else if error.is_rejection() {
            error.message().to_string()
        } else {
            error.to_string()
        }
    }

    /// Failure description tagged with the record identifier
    pub fn describe(&self, identifier: &str, error: &StoreError) -> String {
        format!("{}: {}", identifier, self.reason(error))
    }
}
