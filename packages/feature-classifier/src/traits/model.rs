//! Model handle trait.
//!
//! The classification core only needs to send a text prompt and get text
//! back. Implementations wrap a specific provider (Gemini, OpenAI, ...) and
//! own authentication, transport and response decoding.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ModelResult;

/// An opaque handle to a generative model endpoint.
///
/// Handles are read-only from the classifier's point of view and may be
/// shared freely across concurrent calls.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt and return the model's raw text output.
    async fn generate(&self, prompt: &str) -> ModelResult<String>;

    /// Model identifier, for logging.
    fn name(&self) -> &str;
}

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for Arc<M> {
    async fn generate(&self, prompt: &str) -> ModelResult<String> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<'a, M: LanguageModel + ?Sized> LanguageModel for &'a M {
    async fn generate(&self, prompt: &str) -> ModelResult<String> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for Box<M> {
    async fn generate(&self, prompt: &str) -> ModelResult<String> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
