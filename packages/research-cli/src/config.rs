use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use feature_classifier::{ApiKey, ClassifierConfig, RateLimitConfig};
use std::env;
use std::str::FromStr;

/// Which model provider to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
}

impl Provider {
    /// Environment variable holding this provider's key.
    pub fn key_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            other => bail!("unknown MODEL_PROVIDER: {}", other),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub api_key: ApiKey,
    /// Explicit model; when unset the first working fallback model is used
    pub model_name: Option<String>,
    pub model_base_url: Option<String>,
    pub classifier: ClassifierConfig,
    pub max_concurrent_sites: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider: Provider = lookup("MODEL_PROVIDER")
            .unwrap_or_else(|| "gemini".to_string())
            .parse()?;

        let api_key = lookup(provider.key_var())
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("{} must be set", provider.key_var()))?;

        let defaults = ClassifierConfig::default();
        let rate_limit = RateLimitConfig::new(
            parse_or(&lookup, "RATE_LIMIT_MAX_CALLS", defaults.rate_limit.max_calls)?,
            parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window_secs)?,
        );
        let classifier = ClassifierConfig::new()
            .with_max_site_chars(parse_or(&lookup, "MAX_SITE_CHARS", defaults.max_site_chars)?)
            .with_request_timeout_secs(parse_or(
                &lookup,
                "MODEL_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?)
            .with_rate_limit(rate_limit);
        classifier.validate().context("invalid classifier settings")?;

        let max_concurrent_sites = parse_or(&lookup, "MAX_CONCURRENT_SITES", 4usize)?;
        if max_concurrent_sites == 0 {
            bail!("MAX_CONCURRENT_SITES must be > 0");
        }

        Ok(Self {
            provider,
            api_key: ApiKey::new(api_key.trim()),
            model_name: lookup("MODEL_NAME").filter(|m| !m.trim().is_empty()),
            model_base_url: lookup("MODEL_BASE_URL").filter(|u| !u.trim().is_empty()),
            classifier,
            max_concurrent_sites,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}
