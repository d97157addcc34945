//! Configuration types for the classifier and its rate limiter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClassifierError, Result};

/// Sliding-window rate limit parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum calls admitted within any window.
    ///
    /// Default: 10.
    pub max_calls: usize,

    /// Window length in seconds.
    ///
    /// Default: 60.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: 10,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_calls: usize, window_secs: u64) -> Self {
        Self {
            max_calls,
            window_secs,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_calls == 0 {
            return Err(ClassifierError::Config("max_calls must be > 0".into()));
        }
        if self.window_secs == 0 {
            return Err(ClassifierError::Config("window_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// Configuration for the feature classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Character cap applied to site text before prompting.
    ///
    /// Default: 8000.
    pub max_site_chars: usize,

    /// Upper bound on a single model call, in seconds.
    ///
    /// Exceeding it degrades the result. Default: 120.
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_site_chars: 8000,
            request_timeout_secs: 120,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ClassifierConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the site text cap.
    pub fn with_max_site_chars(mut self, max: usize) -> Self {
        self.max_site_chars = max;
        self
    }

    /// Set the per-call timeout.
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set the rate limit.
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_site_chars == 0 {
            return Err(ClassifierError::Config("max_site_chars must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClassifierError::Config(
                "request_timeout_secs must be > 0".into(),
            ));
        }
        self.rate_limit.validate()
    }
}
