//! Landscape file loading and URL list parsing.

use anyhow::{bail, Context, Result};
use feature_classifier::{FeatureSpec, Landscape};
use std::collections::HashSet;
use std::path::Path;

/// Features used when a landscape file defines none.
pub fn default_features() -> Vec<FeatureSpec> {
    vec![
        FeatureSpec::new("Compliance")
            .with_description("Security standards")
            .with_indicators("SOC2, ISO, HIPAA"),
        FeatureSpec::new("Mobile App")
            .with_description("Availability of iOS/Android apps")
            .with_indicators("App Store, Play Store")
            .with_exclusions("web-only"),
    ]
}

/// Load and check a landscape definition from a JSON file.
///
/// ```json
/// {
///   "name": "Secure File Transfer",
///   "description": "Secure file sharing systems",
///   "features": [
///     { "name": "Compliance", "description": "...", "indicators": "SOC2", "exclusions": "" }
///   ]
/// }
/// ```
pub fn load_landscape(path: &Path) -> Result<Landscape> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read landscape file {}", path.display()))?;
    parse_landscape(&raw).with_context(|| format!("invalid landscape file {}", path.display()))
}

pub fn parse_landscape(raw: &str) -> Result<Landscape> {
    let mut landscape: Landscape = serde_json::from_str(raw)?;

    if landscape.name.trim().is_empty() {
        bail!("landscape name must not be empty");
    }
    if landscape.features.is_empty() {
        tracing::info!("no features defined, using defaults");
        landscape.features = default_features();
    }

    let mut seen = HashSet::new();
    for feature in &landscape.features {
        if feature.name.trim().is_empty() {
            bail!("feature names must not be empty");
        }
        if !seen.insert(feature.name.as_str()) {
            bail!("duplicate feature name: {}", feature.name);
        }
    }

    Ok(landscape)
}

/// Split a comma- or whitespace-separated URL list. `#` starts a comment.
pub fn parse_url_list(input: &str) -> Vec<String> {
    input
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(|line| line.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|u| !u.is_empty())
        .map(normalize_url)
        .collect()
}

/// Add `https://` to bare domains.
pub fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
