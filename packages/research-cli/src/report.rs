//! Analysis report: JSON output and console summary.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use feature_classifier::{Answer, Classification, ClassificationResult, Outcome, ProductInfo};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// How processing of one site ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Succeeded,
    Degraded,
    Skipped,
    FetchFailed,
    Cancelled,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Degraded => "degraded",
            Self::Skipped => "skipped",
            Self::FetchFailed => "fetch_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the report.
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub url: String,
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductInfo>,
    pub status: SiteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub answers: IndexMap<String, Answer>,
    pub reasons: IndexMap<String, String>,
}

impl SiteReport {
    /// Row for a finished classification.
    pub fn classified(
        url: impl Into<String>,
        company: Option<String>,
        classification: Classification,
    ) -> Self {
        let (status, error) = match classification.outcome {
            Outcome::Succeeded => (SiteStatus::Succeeded, None),
            Outcome::Skipped => (SiteStatus::Skipped, None),
            Outcome::Degraded { phase, cause } => {
                (SiteStatus::Degraded, Some(format!("{}: {}", phase, cause)))
            }
        };
        let ClassificationResult { answers, reasons } = classification.result;
        Self {
            url: url.into(),
            company,
            product: None,
            status,
            error,
            answers,
            reasons,
        }
    }

    pub fn with_product(mut self, product: Option<ProductInfo>) -> Self {
        self.product = product;
        self
    }

    /// Row for a site whose text could not be obtained.
    pub fn fetch_failed(url: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::without_answers(url, SiteStatus::FetchFailed, Some(error.to_string()))
    }

    /// Row for a site abandoned on shutdown.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::without_answers(url, SiteStatus::Cancelled, None)
    }

    fn without_answers(url: impl Into<String>, status: SiteStatus, error: Option<String>) -> Self {
        Self {
            url: url.into(),
            company: None,
            product: None,
            status,
            error,
            answers: IndexMap::new(),
            reasons: IndexMap::new(),
        }
    }
}

/// The full analysis report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub landscape: String,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<SiteReport>,
}

impl Report {
    pub fn new(landscape: impl Into<String>, results: Vec<SiteReport>) -> Self {
        Self {
            landscape: landscape.into(),
            generated_at: Utc::now(),
            results,
        }
    }

    /// Number of rows with `status`.
    pub fn count(&self, status: SiteStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Write pretty JSON to `path`, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Print a per-site summary to stdout.
    pub fn print_summary(&self) {
        println!();
        println!("{}", format!("Landscape: {}", self.landscape).cyan().bold());
        println!("{}", "─".repeat(60).dimmed());

        for row in &self.results {
            let title = match &row.company {
                Some(company) => format!("{} ({})", company, row.url),
                None => row.url.clone(),
            };
            println!("{}  [{}]", title.bold(), style_status(row.status));
            if let Some(product) = &row.product {
                println!("    {} {}", product.name.cyan(), product.description.dimmed());
                if !product.features.is_empty() {
                    println!("    {}", product.features.join(", ").dimmed());
                }
            }
            if let Some(error) = &row.error {
                println!("    {}", error.dimmed());
            }
            for (feature, answer) in &row.answers {
                let reason = row.reasons.get(feature).map(String::as_str).unwrap_or_default();
                println!("    {:<24} {:<8} {}", feature, style_answer(*answer), reason.dimmed());
            }
        }

        println!("{}", "─".repeat(60).dimmed());
        println!(
            "{} succeeded, {} degraded, {} fetch failed, {} cancelled",
            self.count(SiteStatus::Succeeded).to_string().green(),
            self.count(SiteStatus::Degraded).to_string().yellow(),
            self.count(SiteStatus::FetchFailed).to_string().red(),
            self.count(SiteStatus::Cancelled).to_string().dimmed(),
        );
    }
}

/// Default report path: `output/<landscape_name>_analysis.json`.
pub fn default_output_path(landscape: &str) -> PathBuf {
    let stem: String = landscape
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    PathBuf::from("output").join(format!("{}_analysis.json", stem))
}

fn style_answer(answer: Answer) -> ColoredString {
    match answer {
        Answer::Yes => answer.as_str().green(),
        Answer::No => answer.as_str().red(),
        Answer::Unsure => answer.as_str().yellow(),
    }
}

fn style_status(status: SiteStatus) -> ColoredString {
    match status {
        SiteStatus::Succeeded => status.as_str().green(),
        SiteStatus::Degraded => status.as_str().yellow(),
        SiteStatus::Skipped => status.as_str().white(),
        SiteStatus::FetchFailed => status.as_str().red(),
        SiteStatus::Cancelled => status.as_str().dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_classifier::{FeatureSpec, Phase};

    #[test]
    fn test_degraded_row_carries_cause() {
        let features = vec![FeatureSpec::new("SSO"), FeatureSpec::new("API")];
        let row = SiteReport::classified(
            "https://acme.io",
            Some("Acme".into()),
            Classification {
                result: ClassificationResult::degraded(&features),
                outcome: Outcome::Degraded {
                    phase: Phase::Invoking,
                    cause: "timed out".into(),
                },
            },
        );

        assert_eq!(row.status, SiteStatus::Degraded);
        assert_eq!(row.error.as_deref(), Some("invoking: timed out"));
        assert_eq!(row.answers.keys().collect::<Vec<_>>(), vec!["SSO", "API"]);
    }

    #[test]
    fn test_report_json_shape() {
        let report = Report::new(
            "Secure File Transfer",
            vec![
                SiteReport::fetch_failed("https://down.example", "HTTP 503"),
                SiteReport::cancelled("https://later.example"),
            ],
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["landscape"], "Secure File Transfer");
        assert!(json["generated_at"].is_string());
        assert_eq!(json["results"][0]["status"], "fetch_failed");
        assert_eq!(json["results"][0]["error"], "HTTP 503");
        assert!(json["results"][1].get("error").is_none());
        assert_eq!(json["results"][1]["status"], "cancelled");
        assert_eq!(json["results"][1]["company"], serde_json::Value::Null);
        assert!(json["results"][1].get("product").is_none());
    }

    #[test]
    fn test_product_column_serialized() {
        let features = vec![FeatureSpec::new("SSO")];
        let row = SiteReport::classified(
            "https://acme.io",
            None,
            Classification {
                result: ClassificationResult::degraded(&features),
                outcome: Outcome::Succeeded,
            },
        )
        .with_product(Some(ProductInfo {
            name: "Acme Vault".into(),
            description: "Encrypted file sharing.".into(),
            features: vec!["SFTP".into(), "Audit logs".into()],
            fallback: false,
        }));

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["product"]["name"], "Acme Vault");
        assert_eq!(json["product"]["features"][1], "Audit logs");
    }

    #[test]
    fn test_write_json_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        Report::new("X", vec![]).write_json(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"landscape\": \"X\""));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("Secure File Transfer"),
            PathBuf::from("output/secure_file_transfer_analysis.json")
        );
    }
}
