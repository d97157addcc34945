//! Feature schema, classification request and result types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{ClassifierError, Result};

/// Reason recorded for every feature when classification degrades.
pub const DEGRADED_REASON: &str = "Error during analysis";

/// Reason recorded when the model answered but skipped a feature.
pub const MISSING_REASON: &str = "Missing from model response";

/// One product feature to look for on a website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Unique name within a request; used as the result key
    pub name: String,

    /// What the feature means in this landscape
    #[serde(default)]
    pub description: String,

    /// Text patterns implying the feature is present
    #[serde(default)]
    pub indicators: String,

    /// Text patterns implying the feature is absent
    #[serde(default)]
    pub exclusions: String,
}

impl FeatureSpec {
    /// Create a feature with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            indicators: String::new(),
            exclusions: String::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the presence indicators.
    pub fn with_indicators(mut self, indicators: impl Into<String>) -> Self {
        self.indicators = indicators.into();
        self
    }

    /// Set the exclusion indicators.
    pub fn with_exclusions(mut self, exclusions: impl Into<String>) -> Self {
        self.exclusions = exclusions.into();
        self
    }
}

/// A landscape: the market segment being researched and its feature schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landscape {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub features: Vec<FeatureSpec>,
}

impl Landscape {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            features: Vec::new(),
        }
    }

    /// Add a feature to the schema.
    pub fn with_feature(mut self, feature: FeatureSpec) -> Self {
        self.features.push(feature);
        self
    }

    /// Build a classification request for one site against this landscape.
    pub fn request_for<'a>(&'a self, url: &'a str, site_text: &'a str) -> ClassificationRequest<'a> {
        ClassificationRequest::new(url, site_text, &self.features)
            .with_landscape(&self.name, &self.description)
    }
}

/// Input bundle for one classification call.
///
/// Borrows the feature schema from the caller so one schema can be shared
/// across every site in a run.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRequest<'a> {
    /// Site identifier, used for logging only
    pub url: &'a str,

    /// Extracted page text (truncated by the classifier before prompting)
    pub site_text: &'a str,

    pub landscape_name: &'a str,

    pub landscape_description: &'a str,

    /// Ordered feature schema; names must not repeat
    pub features: &'a [FeatureSpec],
}

impl<'a> ClassificationRequest<'a> {
    pub fn new(url: &'a str, site_text: &'a str, features: &'a [FeatureSpec]) -> Self {
        Self {
            url,
            site_text,
            landscape_name: "",
            landscape_description: "",
            features,
        }
    }

    /// Set the landscape context.
    pub fn with_landscape(mut self, name: &'a str, description: &'a str) -> Self {
        self.landscape_name = name;
        self.landscape_description = description;
        self
    }

    /// Reject requests whose feature names repeat.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.features.len());
        for feature in self.features {
            if !seen.insert(feature.name.as_str()) {
                return Err(ClassifierError::InvalidRequest {
                    reason: format!("duplicate feature name: {}", feature.name),
                });
            }
        }
        Ok(())
    }

    /// Features with repeated names collapsed to their first occurrence.
    pub fn unique_features(&self) -> Vec<&'a FeatureSpec> {
        let mut seen = HashSet::with_capacity(self.features.len());
        self.features
            .iter()
            .filter(|f| seen.insert(f.name.as_str()))
            .collect()
    }
}

/// A normalized model answer for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Answer {
    Yes,
    No,
    Unsure,
}

impl Answer {
    /// Normalize a raw answer token.
    ///
    /// Matches `yes`/`no`/`unsure` case-insensitively; anything else,
    /// including hedges like "Partially", folds into `Unsure`.
    pub fn normalize(token: &str) -> Self {
        let token = token.trim();
        if token.eq_ignore_ascii_case("yes") {
            Self::Yes
        } else if token.eq_ignore_ascii_case("no") {
            Self::No
        } else {
            Self::Unsure
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Unsure => "Unsure",
        }
    }
}

impl Default for Answer {
    fn default() -> Self {
        Self::Unsure
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-feature answers and justifications.
///
/// Always holds exactly one entry per requested feature name, in request
/// order, in both maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub answers: IndexMap<String, Answer>,
    pub reasons: IndexMap<String, String>,
}

impl ClassificationResult {
    /// An empty result (no features requested).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every feature set to `Unsure` with the same reason.
    pub fn uniform<'f>(
        features: impl IntoIterator<Item = &'f FeatureSpec>,
        reason: &str,
    ) -> Self {
        let mut result = Self::empty();
        for feature in features {
            result.insert(&feature.name, Answer::Unsure, reason);
        }
        result
    }

    /// The degraded result: every feature `Unsure`, reason [`DEGRADED_REASON`].
    pub fn degraded<'f>(features: impl IntoIterator<Item = &'f FeatureSpec>) -> Self {
        Self::uniform(features, DEGRADED_REASON)
    }

    pub(crate) fn insert(&mut self, name: &str, answer: Answer, reason: impl Into<String>) {
        self.answers.insert(name.to_string(), answer);
        self.reasons.insert(name.to_string(), reason.into());
    }

    pub fn answer(&self, feature: &str) -> Option<Answer> {
        self.answers.get(feature).copied()
    }

    pub fn reason(&self, feature: &str) -> Option<&str> {
        self.reasons.get(feature).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Count answers equal to `answer`.
    pub fn count(&self, answer: Answer) -> usize {
        self.answers.values().filter(|a| **a == answer).count()
    }

    /// Whether every feature carries the degraded marker.
    pub fn is_degraded(&self) -> bool {
        !self.is_empty() && self.reasons.values().all(|r| r == DEGRADED_REASON)
    }
}
