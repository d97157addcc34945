pub mod config;
pub mod feature;

pub use config::{ClassifierConfig, RateLimitConfig};
pub use feature::{
    Answer, ClassificationRequest, ClassificationResult, FeatureSpec, Landscape, DEGRADED_REASON,
    MISSING_REASON,
};
