//! Company name identification.
//!
//! Asks the model for the official company name behind a site, looking at
//! the header and footer of the extracted text. Spends the same rate-limit
//! budget as classification and falls back to a name derived from the
//! domain on any failure.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClassifierError, Result};
use crate::prompts::format_identity_prompt;
use crate::rate_limiter::SlidingWindowLimiter;
use crate::response::{clean_text, parse_tree};
use crate::traits::model::LanguageModel;

/// Characters taken from each end of the site text.
pub const IDENTITY_EDGE_CHARS: usize = 2000;

/// Where the company name came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    pub name: String,

    /// The model's stated source ("header", "footer", ...), or "domain" on fallback
    pub source: String,

    /// True when the name is the domain hint because the model call failed
    pub fallback: bool,
}

impl CompanyIdentity {
    fn from_domain(domain: String) -> Self {
        Self {
            name: domain,
            source: "domain".to_string(),
            fallback: true,
        }
    }
}

/// Capitalized first label of the host, without `www.`.
///
/// `https://www.acme-robotics.io/about` → `Acme-robotics`.
pub fn domain_hint(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.trim().to_string());
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let label = host.split('.').next().unwrap_or_default();

    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Identify the company behind `url`. Never fails.
pub async fn identify_company<M>(
    url: &str,
    site_text: &str,
    model: &M,
    limiter: &SlidingWindowLimiter,
    timeout: Duration,
) -> CompanyIdentity
where
    M: LanguageModel + ?Sized,
{
    let domain = domain_hint(url);
    match try_identify(url, &domain, site_text, model, limiter, timeout).await {
        Ok(identity) => {
            debug!(url = %url, name = %identity.name, source = %identity.source, "company identified");
            identity
        }
        Err(e) => {
            warn!(url = %url, error = %e, "company identification failed, using domain");
            CompanyIdentity::from_domain(domain)
        }
    }
}

async fn try_identify<M>(
    url: &str,
    domain: &str,
    site_text: &str,
    model: &M,
    limiter: &SlidingWindowLimiter,
    timeout: Duration,
) -> Result<CompanyIdentity>
where
    M: LanguageModel + ?Sized,
{
    let prompt = format_identity_prompt(url, domain, site_text, IDENTITY_EDGE_CHARS);

    limiter.acquire().await;
    let raw = tokio::time::timeout(timeout, model.generate(&prompt))
        .await
        .map_err(|_| ClassifierError::Timeout { after: timeout })??;

    let tree = parse_tree(&raw)?;
    let name = tree
        .get("company_name")
        .and_then(|v| v.as_str())
        .map(clean_text)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ClassifierError::malformed("missing company_name"))?;
    let source = tree
        .get("confidence_source")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "content".to_string());

    Ok(CompanyIdentity {
        name,
        source,
        fallback: false,
    })
}
