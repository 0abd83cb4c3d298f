use thiserror::Error;

/// Failure reported by a [`Store`](super::Store) call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The store received the request and refused it (constraint, bad column, ...)
    #[error("{message}")]
    Rejected {
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    /// The request never got a response (connection refused, timeout, ...)
    #[error("store unreachable: {0}")]
    Transport(String),

    /// The store answered with something we could not interpret
    #[error("unexpected store response: {0}")]
    Protocol(String),
}

impl StoreError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: Some(code.into()),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Machine-readable code, when the store supplied one
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Human-readable message without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected { message, .. } => message,
            Self::Transport(message) | Self::Protocol(message) => message,
        }
    }

    /// True when the store itself refused the write
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Protocol(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
