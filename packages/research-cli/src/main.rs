//! Market research binary.
//!
//! ```text
//! market-research landscapes/file_transfer.json acme.io box.com --text-dir texts/
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use feature_classifier::ai::{
    select_working_model, GeminiModel, OpenAIModel, GEMINI_FALLBACK_MODELS,
};
use feature_classifier::{FeatureClassifier, LanguageModel};
use research_cli::landscape::load_landscape;
use research_cli::report::default_output_path;
use research_cli::{
    Cli, Config, HttpTextSource, Orchestrator, Provider, SiteTextSource, TextDirSource,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,feature_classifier=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let landscape = load_landscape(&cli.landscape)?;
    let urls = cli.collect_urls()?;
    tracing::info!(
        landscape = %landscape.name,
        provider = ?config.provider,
        sites = urls.len(),
        "Starting market research"
    );

    let classifier = FeatureClassifier::from_config(config.classifier.clone())
        .context("Invalid classifier configuration")?;
    let model = build_model(&config, &classifier).await?;

    let source: Arc<dyn SiteTextSource> = match &cli.text_dir {
        Some(dir) => Arc::new(TextDirSource::new(dir)),
        None => Arc::new(HttpTextSource::new()?),
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling outstanding sites");
            ctrl_c.cancel();
        }
    });

    let orchestrator = Orchestrator::new(classifier, source, model)
        .with_max_concurrent(cli.max_concurrent.unwrap_or(config.max_concurrent_sites))
        .with_company_identification(cli.identify_company)
        .with_product_extraction(cli.extract_products);
    let report = orchestrator.run(&landscape, &urls, &cancel).await;

    report.print_summary();

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&landscape.name));
    report.write_json(&output)?;
    println!("{} {}", "Report written to".bright_green(), output.display());

    Ok(())
}

async fn build_model(
    config: &Config,
    classifier: &FeatureClassifier,
) -> Result<Arc<dyn LanguageModel>> {
    let model: Arc<dyn LanguageModel> = match config.provider {
        Provider::Gemini => {
            let build = |name: &str| {
                let model = GeminiModel::new(config.api_key.clone()).with_model(name);
                match &config.model_base_url {
                    Some(url) => model.with_base_url(url),
                    None => model,
                }
            };
            match &config.model_name {
                Some(name) => Arc::new(build(name)),
                None => Arc::new(
                    select_working_model(
                        GEMINI_FALLBACK_MODELS,
                        classifier.limiter(),
                        classifier.config().request_timeout(),
                        build,
                    )
                    .await
                    .context("No Gemini model available")?,
                ),
            }
        }
        Provider::OpenAI => {
            let mut model = OpenAIModel::new(config.api_key.clone());
            if let Some(name) = &config.model_name {
                model = model.with_model(name);
            }
            if let Some(url) = &config.model_base_url {
                model = model.with_base_url(url);
            }
            Arc::new(model)
        }
    };

    tracing::info!(model = %model.name(), "Model ready");
    Ok(model)
}
