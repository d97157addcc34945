//! HTTP model adapters and model selection.

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "gemini")]
pub use gemini::GeminiModel;
#[cfg(feature = "openai")]
pub use openai::OpenAIModel;

use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ModelError, ModelResult};
use crate::prompts::HEALTH_CHECK_PROMPT;
use crate::rate_limiter::SlidingWindowLimiter;
use crate::traits::model::LanguageModel;

/// Gemini models tried in order when none is configured.
pub const GEMINI_FALLBACK_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-flash-latest",
    "gemini-1.5-flash",
];

/// Return the first candidate model that answers a health-check prompt.
///
/// Each check spends one slot of `limiter`, like any other model call, and
/// counts as failed if it does not answer within `timeout`.
pub async fn select_working_model<M, F>(
    candidates: &[&str],
    limiter: &SlidingWindowLimiter,
    timeout: Duration,
    build: F,
) -> ModelResult<M>
where
    M: LanguageModel,
    F: Fn(&str) -> M,
{
    let mut last_error = None;
    for name in candidates {
        let model = build(name);
        limiter.acquire().await;
        let check = tokio::time::timeout(timeout, model.generate(HEALTH_CHECK_PROMPT))
            .await
            .unwrap_or_else(|_| {
                Err(ModelError::Network(format!(
                    "health check timed out after {}s",
                    timeout.as_secs()
                )))
            });
        match check {
            Ok(_) => {
                info!(model = %name, "using model");
                return Ok(model);
            }
            Err(e) => {
                debug!(model = %name, error = %e, "model health check failed");
                last_error = Some(e);
            }
        }
    }

    Err(ModelError::Config(match last_error {
        Some(e) => format!(
            "no working model among {:?} (last error: {})",
            candidates, e
        ),
        None => "no candidate models given".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_select_first_working() {
        let limiter = SlidingWindowLimiter::new(10, Duration::from_secs(60));

        let candidates = ["broken", "fine", "unused"];
        let model = select_working_model(&candidates, &limiter, CHECK_TIMEOUT, |name| {
            let mock = MockModel::new().with_name(name);
            if name == "broken" {
                mock.with_error(ModelError::Api {
                    status: 404,
                    message: "model not found".into(),
                })
            } else {
                mock.with_response(r#"{"status": "OK"}"#)
            }
        })
        .await
        .unwrap();

        assert_eq!(model.name(), "fine");
        assert_eq!(limiter.recent_calls(), 2);
    }

    #[tokio::test]
    async fn test_select_none_working() {
        let limiter = SlidingWindowLimiter::new(10, Duration::from_secs(60));

        let err = select_working_model(&["a", "b"], &limiter, CHECK_TIMEOUT, |name| {
            MockModel::new()
                .with_name(name)
                .with_error(ModelError::Network("unreachable".into()))
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("unreachable"));

        let err =
            select_working_model::<MockModel, _>(&[], &limiter, CHECK_TIMEOUT, |_| MockModel::new())
                .await
                .unwrap_err();
        assert!(err.to_string().contains("no candidate models"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_model_is_skipped() {
        let limiter = SlidingWindowLimiter::new(10, Duration::from_secs(60));
        let start = tokio::time::Instant::now();

        let model = select_working_model(&["hung", "fine"], &limiter, CHECK_TIMEOUT, |name| {
            let mock = MockModel::new()
                .with_name(name)
                .with_response(r#"{"status": "OK"}"#);
            if name == "hung" {
                mock.with_latency(Duration::from_secs(3600))
            } else {
                mock
            }
        })
        .await
        .unwrap();

        assert_eq!(model.name(), "fine");
        assert_eq!(start.elapsed(), CHECK_TIMEOUT);
    }
}
