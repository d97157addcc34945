//! API keys held in secret memory.
//!
//! Uses the `secrecy` crate so keys never end up in logs, `Debug` output or
//! error messages.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// A provider API key that redacts itself when formatted.
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Read a key from an environment variable, rejecting blank values.
    pub fn from_env(var: &str) -> ModelResult<Self> {
        let value = std::env::var(var)
            .map_err(|_| ModelError::Config(format!("{} not set", var)))?;
        if value.trim().is_empty() {
            return Err(ModelError::Config(format!("{} is empty", var)));
        }
        Ok(Self::new(value.trim()))
    }

    /// Expose the key for use in a request.
    ///
    /// Only call this at the point the key goes on the wire.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_redacted() {
        let key = ApiKey::new("AIza-secret-value");

        assert_eq!(format!("{}", key), "[REDACTED]");
        assert!(!format!("{:?}", key).contains("secret"));
        assert_eq!(key.expose(), "AIza-secret-value");
        assert_eq!(key.clone().expose(), "AIza-secret-value");
    }

    #[test]
    fn test_from_env_missing() {
        let err = ApiKey::from_env("FEATURE_CLASSIFIER_TEST_UNSET_KEY").unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
    }
}
