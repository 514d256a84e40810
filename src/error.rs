//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror. Provider
//! failures keep their status, body detail, and message separate because the
//! balance-exhaustion detectors inspect each surface independently.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("History store error: {0}")]
    History(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// A failed outbound generation call.
///
/// `status` is the HTTP status when the vendor answered at all, `detail` is
/// the `detail` field of a structured error body when one was present, and
/// `message` is the best-effort human-readable text.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub detail: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            status: None,
            detail: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            detail: None,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
