//! Product information extraction.
//!
//! A second model call per site that pulls out the main product name, a
//! one-sentence description and its core features. Shares the limiter and
//! timeout with classification and falls back to "Not specified" on any
//! failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ClassifierError, Result};
use crate::prompts::format_product_prompt;
use crate::rate_limiter::SlidingWindowLimiter;
use crate::response::{clean_text, parse_tree};
use crate::traits::model::LanguageModel;
use crate::types::feature::Landscape;

/// Placeholder for any product field the model did not supply.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Characters of site text sent with the product prompt.
pub const PRODUCT_TEXT_CHARS: usize = 4000;

/// Most features kept from one response.
const MAX_PRODUCT_FEATURES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub description: String,
    pub features: Vec<String>,

    /// True when the model call failed and every field is a placeholder
    pub fallback: bool,
}

impl ProductInfo {
    pub fn not_specified() -> Self {
        Self {
            name: NOT_SPECIFIED.to_string(),
            description: NOT_SPECIFIED.to_string(),
            features: Vec::new(),
            fallback: true,
        }
    }
}

/// Extract product information for `url`. Never fails.
///
/// Blank site text skips the model call entirely.
pub async fn extract_product_info<M>(
    url: &str,
    site_text: &str,
    landscape: &Landscape,
    model: &M,
    limiter: &SlidingWindowLimiter,
    timeout: Duration,
) -> ProductInfo
where
    M: LanguageModel + ?Sized,
{
    if site_text.trim().is_empty() {
        debug!(url = %url, "no site text, skipping product extraction");
        return ProductInfo::not_specified();
    }

    match try_extract(url, site_text, landscape, model, limiter, timeout).await {
        Ok(product) => {
            debug!(
                url = %url,
                product = %product.name,
                features = product.features.len(),
                "product extracted"
            );
            product
        }
        Err(e) => {
            warn!(url = %url, error = %e, "product extraction failed");
            ProductInfo::not_specified()
        }
    }
}

async fn try_extract<M>(
    url: &str,
    site_text: &str,
    landscape: &Landscape,
    model: &M,
    limiter: &SlidingWindowLimiter,
    timeout: Duration,
) -> Result<ProductInfo>
where
    M: LanguageModel + ?Sized,
{
    let prompt = format_product_prompt(
        url,
        &landscape.name,
        &landscape.description,
        site_text,
        PRODUCT_TEXT_CHARS,
    );

    limiter.acquire().await;
    let raw = tokio::time::timeout(timeout, model.generate(&prompt))
        .await
        .map_err(|_| ClassifierError::Timeout { after: timeout })??;

    let tree = parse_tree(&raw)?;
    if !tree.is_object() {
        return Err(ClassifierError::malformed("product response is not an object"));
    }

    let features = match tree.get("features") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(clean_text)
            .filter(|f| !f.is_empty())
            .take(MAX_PRODUCT_FEATURES)
            .collect(),
        _ => Vec::new(),
    };

    Ok(ProductInfo {
        name: text_field(&tree, "product_name"),
        description: text_field(&tree, "description"),
        features,
        fallback: false,
    })
}

fn text_field(tree: &Value, key: &str) -> String {
    tree.get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::testing::MockModel;

    const TIMEOUT: Duration = Duration::from_secs(30);
    const URL: &str = "https://acme.io";

    fn landscape() -> Landscape {
        Landscape::new("Customer Support", "Helpdesk software")
    }

    #[tokio::test]
    async fn test_extract_from_model() {
        let limiter = SlidingWindowLimiter::default();
        let model = MockModel::new().with_response(
            r#"```json
{"product_name": "Acme Desk",
 "description": "Ticketing for  small teams.",
 "features": ["Live chat", "", 42, "SLA tracking"]}
```"#,
        );

        let product =
            extract_product_info(URL, "Acme Desk", &landscape(), &model, &limiter, TIMEOUT).await;

        assert_eq!(product.name, "Acme Desk");
        assert_eq!(product.description, "Ticketing for small teams.");
        assert_eq!(product.features, vec!["Live chat", "SLA tracking"]);
        assert!(!product.fallback);
        assert_eq!(limiter.recent_calls(), 1);
        assert!(model.prompts()[0].contains("Helpdesk software"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_not_specified() {
        let limiter = SlidingWindowLimiter::default();
        let model = MockModel::new().with_response(r#"{"features": "not a list"}"#);

        let product =
            extract_product_info(URL, "text", &landscape(), &model, &limiter, TIMEOUT).await;

        assert_eq!(product.name, NOT_SPECIFIED);
        assert_eq!(product.description, NOT_SPECIFIED);
        assert!(product.features.is_empty());
        assert!(!product.fallback);
    }

    #[tokio::test]
    async fn test_failures_fall_back() {
        let limiter = SlidingWindowLimiter::default();
        for model in [
            MockModel::new().with_error(ModelError::Network("down".into())),
            MockModel::new().with_response("[\"Acme\"]"),
            MockModel::new().with_response("no json here"),
        ] {
            let product =
                extract_product_info(URL, "text", &landscape(), &model, &limiter, TIMEOUT).await;
            assert_eq!(product, ProductInfo::not_specified());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let limiter = SlidingWindowLimiter::default();
        let model = MockModel::new()
            .with_response(r#"{"product_name": "Late"}"#)
            .with_latency(Duration::from_secs(600));

        let product =
            extract_product_info(URL, "text", &landscape(), &model, &limiter, TIMEOUT).await;
        assert!(product.fallback);
    }

    #[tokio::test]
    async fn test_blank_text_skips_model() {
        let limiter = SlidingWindowLimiter::default();
        let model = MockModel::new().with_response("{}");

        let product =
            extract_product_info(URL, "  \n", &landscape(), &model, &limiter, TIMEOUT).await;

        assert!(product.fallback);
        assert_eq!(model.call_count(), 0);
        assert_eq!(limiter.recent_calls(), 0);
    }
}
