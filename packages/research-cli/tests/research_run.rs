//! End-to-end run: landscape file, pre-extracted text, Gemini over HTTP.

use std::sync::Arc;
use std::time::Duration;

use feature_classifier::ai::GeminiModel;
use feature_classifier::{
    ClassifierConfig, FeatureClassifier, SlidingWindowLimiter, DEGRADED_REASON,
};
use research_cli::landscape::load_landscape;
use research_cli::{Orchestrator, SiteStatus, TextDirSource};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gemini_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] }, "finishReason": "STOP" }]
    }))
}

#[tokio::test]
async fn test_landscape_run_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let landscape_path = dir.path().join("landscape.json");
    std::fs::write(
        &landscape_path,
        r#"{
            "name": "Secure File Transfer",
            "description": "Secure file sharing systems",
            "features": [
                {"name": "Compliance", "indicators": "SOC2, ISO, HIPAA"},
                {"name": "Mobile App", "indicators": "App Store, Play Store", "exclusions": "web-only"}
            ]
        }"#,
    )
    .unwrap();

    let texts = dir.path().join("texts");
    std::fs::create_dir(&texts).unwrap();
    std::fs::write(texts.join("securebox.example.txt"), "SecureBox. SOC2 Type II certified.").unwrap();
    std::fs::write(texts.join("flaky.example.txt"), "Flaky Transfer. Web-only uploads.").unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .and(body_string_contains("SecureBox"))
        .respond_with(gemini_reply(
            r#"{"results": {"Compliance": {"answer": "Yes", "reason": "SOC2 Type II"}, "Mobile App": {"answer": "No", "reason": "No app store links"}}}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .and(body_string_contains("Flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let landscape = load_landscape(&landscape_path).unwrap();
    let model = GeminiModel::new("test-key")
        .with_model("gemini-test")
        .with_base_url(server.uri());
    let limiter = Arc::new(SlidingWindowLimiter::new(10, Duration::from_secs(60)));
    let orchestrator = Orchestrator::new(
        FeatureClassifier::new(limiter, ClassifierConfig::default()),
        Arc::new(TextDirSource::new(&texts)),
        Arc::new(model),
    );

    let urls = vec![
        "https://www.securebox.example".to_string(),
        "https://flaky.example".to_string(),
        "https://missing.example".to_string(),
    ];
    let report = orchestrator.run(&landscape, &urls, &CancellationToken::new()).await;

    let statuses: Vec<_> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![SiteStatus::Succeeded, SiteStatus::Degraded, SiteStatus::FetchFailed]
    );
    assert_eq!(report.results[1].reasons.get("Compliance").map(String::as_str), Some(DEGRADED_REASON));

    let output = dir.path().join("output/secure_file_transfer_analysis.json");
    report.write_json(&output).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();

    assert_eq!(written["landscape"], "Secure File Transfer");
    let first = &written["results"][0];
    assert_eq!(first["url"], "https://www.securebox.example");
    assert_eq!(first["status"], "succeeded");
    assert_eq!(first["answers"]["Compliance"], "Yes");
    assert_eq!(first["answers"]["Mobile App"], "No");
    assert_eq!(first["reasons"]["Compliance"], "SOC2 Type II");
    assert_eq!(written["results"][2]["status"], "fetch_failed");
}
