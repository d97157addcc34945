//! Typed errors for the classification core.
//!
//! Uses `thiserror` for library errors (not `anyhow`). None of these cross
//! the public boundary of [`FeatureClassifier::classify`](crate::FeatureClassifier::classify):
//! they are recovered into a degraded result there.

use std::time::Duration;
use thiserror::Error;

/// Errors raised inside a single classification attempt.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model output could not be parsed into the expected schema
    #[error("malformed model response: {reason}")]
    MalformedResponse { reason: String },

    /// Model service failed (transport, quota, auth)
    #[error("model invocation failed: {0}")]
    ModelInvocation(#[from] ModelError),

    /// Model call did not complete in time
    #[error("model call timed out after {after:?}")]
    Timeout { after: Duration },

    /// Request failed validation (e.g. duplicate feature names)
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Configuration rejected
    #[error("config error: {0}")]
    Config(String),
}

impl ClassifierError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

/// Errors reported by a [`LanguageModel`](crate::LanguageModel) implementation.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Configuration error (missing API key, invalid settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// API error (non-2xx response, quota exhausted, auth rejected)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),
}

impl ModelError {
    /// Whether the service refused the call for quota reasons.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Api { status: 429, .. })
    }
}

/// Result type alias for classification operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Result type alias for model operations.
pub type ModelResult<T> = std::result::Result<T, ModelError>;
