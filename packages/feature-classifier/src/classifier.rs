//! Feature classifier - the rate-limited classification pipeline.
//!
//! One call walks `Idle → Throttled → Invoking → Validating` and ends in
//! either `Succeeded` or `Degraded`. Both are normal returns: every internal
//! failure is carried as a [`ClassifierError`] up to [`FeatureClassifier::classify_with_outcome`],
//! which converts it into the uniform degraded result.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{ClassifierError, Result};
use crate::prompts::format_feature_prompt;
use crate::rate_limiter::SlidingWindowLimiter;
use crate::response::{self, ParsedResponse};
use crate::traits::model::LanguageModel;
use crate::types::config::ClassifierConfig;
use crate::types::feature::{
    Answer, ClassificationRequest, ClassificationResult, FeatureSpec, MISSING_REASON,
};

/// Stage of a classification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    /// Waiting on the rate limiter
    Throttled,
    /// Model call in flight
    Invoking,
    /// Parsing and reconciling model output
    Validating,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Throttled => "throttled",
            Self::Invoking => "invoking",
            Self::Validating => "validating",
        };
        f.write_str(name)
    }
}

/// How a classification call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Model answered with a valid response
    Succeeded,

    /// Something failed; every feature is `Unsure` / "Error during analysis"
    Degraded { phase: Phase, cause: String },

    /// No features requested; the model was not called
    Skipped,
}

impl Outcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// A result together with the outcome that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub result: ClassificationResult,
    pub outcome: Outcome,
}

/// Classifies sites against a feature schema through a shared rate limiter.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = Arc::new(SlidingWindowLimiter::new(10, Duration::from_secs(60)));
/// let classifier = FeatureClassifier::new(limiter, ClassifierConfig::default());
///
/// let request = landscape.request_for("https://example.com", &site_text);
/// let result = classifier.classify(&request, &model).await;
/// ```
#[derive(Debug, Clone)]
pub struct FeatureClassifier {
    limiter: Arc<SlidingWindowLimiter>,
    config: ClassifierConfig,
}

impl FeatureClassifier {
    /// Create a classifier spending the budget of an existing limiter.
    pub fn new(limiter: Arc<SlidingWindowLimiter>, config: ClassifierConfig) -> Self {
        Self { limiter, config }
    }

    /// Create a classifier with its own limiter built from `config.rate_limit`.
    pub fn from_config(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let limiter = Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit)?);
        Ok(Self::new(limiter, config))
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one site. Never fails.
    ///
    /// The result holds exactly one entry per requested feature name.
    pub async fn classify<M>(
        &self,
        request: &ClassificationRequest<'_>,
        model: &M,
    ) -> ClassificationResult
    where
        M: LanguageModel + ?Sized,
    {
        self.classify_with_outcome(request, model).await.result
    }

    /// Classify one site and report how the call ended. Never fails.
    pub async fn classify_with_outcome<M>(
        &self,
        request: &ClassificationRequest<'_>,
        model: &M,
    ) -> Classification
    where
        M: LanguageModel + ?Sized,
    {
        let features = request.unique_features();
        if features.is_empty() {
            debug!(url = %request.url, "no features requested, skipping model call");
            return Classification {
                result: ClassificationResult::empty(),
                outcome: Outcome::Skipped,
            };
        }
        if let Err(e) = request.validate() {
            warn!(url = %request.url, error = %e, "duplicate features collapsed");
        }

        let span = info_span!(
            "classify",
            url = %request.url,
            features = features.len(),
            model = model.name()
        );

        async {
            let start = Instant::now();
            let mut phase = Phase::Idle;

            let attempt = self.run(request, &features, model, &mut phase).await;
            match attempt {
                Ok(result) => {
                    info!(
                        yes = result.count(Answer::Yes),
                        no = result.count(Answer::No),
                        unsure = result.count(Answer::Unsure),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "classification succeeded"
                    );
                    Classification {
                        result,
                        outcome: Outcome::Succeeded,
                    }
                }
                Err(e) => {
                    warn!(
                        phase = %phase,
                        error = %e,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "classification degraded"
                    );
                    Classification {
                        result: ClassificationResult::degraded(features.iter().copied()),
                        outcome: Outcome::Degraded {
                            phase,
                            cause: e.to_string(),
                        },
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// One attempt: throttle, invoke, validate, reconcile. No retries.
    async fn run<M>(
        &self,
        request: &ClassificationRequest<'_>,
        features: &[&FeatureSpec],
        model: &M,
        phase: &mut Phase,
    ) -> Result<ClassificationResult>
    where
        M: LanguageModel + ?Sized,
    {
        let prompt = format_feature_prompt(request, features, self.config.max_site_chars);

        *phase = Phase::Throttled;
        self.limiter.acquire().await;

        *phase = Phase::Invoking;
        let timeout = self.config.request_timeout();
        let raw = tokio::time::timeout(timeout, model.generate(&prompt))
            .await
            .map_err(|_| ClassifierError::Timeout { after: timeout })??;
        debug!(response_len = raw.len(), "model responded");

        *phase = Phase::Validating;
        let parsed = response::validate(&raw)?;
        Ok(reconcile(features, &parsed))
    }
}

/// Build the result for exactly the requested features.
///
/// Features the model skipped become `Unsure` with [`MISSING_REASON`];
/// keys the model invented are dropped.
pub fn reconcile(features: &[&FeatureSpec], parsed: &ParsedResponse) -> ClassificationResult {
    let names: Vec<&str> = features.iter().map(|f| f.name.as_str()).collect();
    let mut result = ClassificationResult::empty();
    for (feature, entry) in features.iter().zip(parsed.match_features(&names)) {
        match entry {
            Some(entry) => result.insert(&feature.name, entry.answer, entry.reason.clone()),
            None => {
                debug!(feature = %feature.name, "feature missing from model response");
                result.insert(&feature.name, Answer::Unsure, MISSING_REASON)
            }
        }
    }
    result
}
