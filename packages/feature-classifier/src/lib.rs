//! Rate-Limited Website Feature Classification
//!
//! Decides whether a company website exhibits a configurable set of product
//! features by asking a generative model structured Yes/No/Unsure questions
//! about the site's extracted text.
//!
//! # Guarantees
//!
//! - Every call returns exactly one answer and one reason per requested
//!   feature, whether the model call succeeded or not
//! - Model failures and unparsable output degrade to `Unsure` /
//!   "Error during analysis" instead of surfacing as errors
//! - All model calls sharing a [`SlidingWindowLimiter`] start at most
//!   `max_calls` times within any `window`
//!
//! # Usage
//!
//! ```rust,ignore
//! use feature_classifier::{ClassifierConfig, FeatureClassifier, FeatureSpec, Landscape};
//! use feature_classifier::ai::GeminiModel;
//!
//! let classifier = FeatureClassifier::from_config(ClassifierConfig::default())?;
//! let model = GeminiModel::from_env()?;
//!
//! let landscape = Landscape::new("Customer Support", "Helpdesk software")
//!     .with_feature(FeatureSpec::new("Live Chat").with_indicators("chat widget"));
//!
//! let result = classifier
//!     .classify(&landscape.request_for("https://example.com", &site_text), &model)
//!     .await;
//! ```
//!
//! # Modules
//!
//! - [`rate_limiter`] - Sliding-window limiter shared across call sites
//! - [`response`] - Model output parsing and schema validation
//! - [`classifier`] - Prompting, invocation, reconciliation, degradation
//! - [`identity`] - Company name identification
//! - [`product`] - Product name, description and feature extraction
//! - [`traits`] - The [`LanguageModel`] handle trait
//! - [`ai`] - Gemini and OpenAI adapters
//! - [`testing`] - Mock model for tests

pub mod ai;
pub mod classifier;
pub mod error;
pub mod identity;
pub mod product;
pub mod prompts;
pub mod rate_limiter;
pub mod response;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use classifier::{reconcile, Classification, FeatureClassifier, Outcome, Phase};
pub use error::{ClassifierError, ModelError, ModelResult, Result};
pub use identity::{domain_hint, identify_company, CompanyIdentity};
pub use product::{extract_product_info, ProductInfo, NOT_SPECIFIED};
pub use rate_limiter::SlidingWindowLimiter;
pub use response::{validate, ParsedAnswer, ParsedResponse};
pub use security::ApiKey;
pub use traits::LanguageModel;
pub use types::{
    Answer, ClassificationRequest, ClassificationResult, ClassifierConfig, FeatureSpec, Landscape,
    RateLimitConfig, DEGRADED_REASON, MISSING_REASON,
};

// Re-export testing utilities
pub use testing::MockModel;
