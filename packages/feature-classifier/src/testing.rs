//! Testing utilities including a mock model.
//!
//! Useful for testing code that uses the classifier without making real
//! model calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{ModelError, ModelResult};
use crate::traits::model::LanguageModel;

/// A scripted model for tests.
///
/// Responses are served in the order they were added; the last one repeats
/// once the script runs out.
#[derive(Debug, Clone)]
pub struct MockModel {
    name: String,

    /// Scripted outputs
    script: Arc<RwLock<VecDeque<ModelResult<String>>>>,

    /// Artificial latency per call
    latency: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockModelCall>>>,
}

/// Record of a call made to the mock model.
#[derive(Debug, Clone)]
pub struct MockModelCall {
    pub prompt: String,
    pub started_at: Instant,
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            name: "mock-model".to_string(),
            script: Arc::new(RwLock::new(VecDeque::new())),
            latency: None,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the reported model name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Queue a successful text response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.script.write().unwrap().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: ModelError) -> Self {
        self.script.write().unwrap().push_back(Err(error));
        self
    }

    /// Delay every call by `latency` (tokio time, so paused clocks apply).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockModelCall> {
        self.calls.read().unwrap().clone()
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn next_output(&self) -> ModelResult<String> {
        let mut script = self.script.write().unwrap();
        let output = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        output.unwrap_or_else(|| {
            Err(ModelError::Api {
                status: 500,
                message: "no scripted response".to_string(),
            })
        })
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn generate(&self, prompt: &str) -> ModelResult<String> {
        self.calls.write().unwrap().push(MockModelCall {
            prompt: prompt.to_string(),
            started_at: Instant::now(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.next_output()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_order_and_repeat() {
        let model = MockModel::new()
            .with_response("first")
            .with_error(ModelError::Network("down".into()))
            .with_response("last");

        assert_eq!(model.generate("a").await.unwrap(), "first");
        assert!(model.generate("b").await.is_err());
        assert_eq!(model.generate("c").await.unwrap(), "last");
        assert_eq!(model.generate("d").await.unwrap(), "last");
        assert_eq!(model.prompts(), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_unscripted_call_fails() {
        let model = MockModel::new();
        assert!(model.generate("prompt").await.is_err());
        assert_eq!(model.call_count(), 1);

        model.clear_calls();
        assert_eq!(model.call_count(), 0);
    }
}
