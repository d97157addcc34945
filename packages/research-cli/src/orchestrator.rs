//! Runs a landscape over a list of sites.
//!
//! Sites are processed concurrently (bounded by `max_concurrent`); every
//! model call (classification, company lookup or product extraction) goes
//! through the one limiter owned by the classifier. Rows come back in input
//! order.

use feature_classifier::{
    extract_product_info, identify_company, FeatureClassifier, Landscape, LanguageModel,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::report::{Report, SiteReport};
use crate::site_text::SiteTextSource;

pub struct Orchestrator {
    classifier: FeatureClassifier,
    source: Arc<dyn SiteTextSource>,
    model: Arc<dyn LanguageModel>,
    max_concurrent: usize,
    identify_companies: bool,
    extract_products: bool,
}

impl Orchestrator {
    pub fn new(
        classifier: FeatureClassifier,
        source: Arc<dyn SiteTextSource>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            classifier,
            source,
            model,
            max_concurrent: 4,
            identify_companies: false,
            extract_products: false,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Also ask the model for each site's company name (one extra call per site).
    pub fn with_company_identification(mut self, enabled: bool) -> Self {
        self.identify_companies = enabled;
        self
    }

    /// Also extract product name, description and features (one extra call per site).
    pub fn with_product_extraction(mut self, enabled: bool) -> Self {
        self.extract_products = enabled;
        self
    }

    /// Process every URL and build the report.
    ///
    /// Once `cancel` fires, sites still waiting or in flight are reported
    /// as cancelled.
    pub async fn run(
        &self,
        landscape: &Landscape,
        urls: &[String],
        cancel: &CancellationToken,
    ) -> Report {
        info!(
            landscape = %landscape.name,
            sites = urls.len(),
            features = landscape.features.len(),
            max_concurrent = self.max_concurrent,
            "starting analysis"
        );

        let mut rows: Vec<(usize, SiteReport)> = stream::iter(urls.iter().enumerate())
            .map(|(index, url)| async move {
                let row = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => SiteReport::cancelled(url.as_str()),
                    row = self.process_site(landscape, url) => row,
                };
                (index, row)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        rows.sort_by_key(|(index, _)| *index);
        let report = Report::new(&landscape.name, rows.into_iter().map(|(_, row)| row).collect());
        info!(
            sites = report.results.len(),
            cancelled = cancel.is_cancelled(),
            "analysis finished"
        );
        report
    }

    async fn process_site(&self, landscape: &Landscape, url: &str) -> SiteReport {
        let span = tracing::info_span!("site", url = %url);
        async {
            let text = match self.source.fetch(url).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "could not get site text");
                    return SiteReport::fetch_failed(url, format!("{:#}", e));
                }
            };

            let company = if self.identify_companies {
                let identity = identify_company(
                    url,
                    &text,
                    self.model.as_ref(),
                    self.classifier.limiter(),
                    self.classifier.config().request_timeout(),
                )
                .await;
                Some(identity.name)
            } else {
                None
            };

            let product = if self.extract_products {
                Some(
                    extract_product_info(
                        url,
                        &text,
                        landscape,
                        self.model.as_ref(),
                        self.classifier.limiter(),
                        self.classifier.config().request_timeout(),
                    )
                    .await,
                )
            } else {
                None
            };

            let request = landscape.request_for(url, &text);
            let classification = self
                .classifier
                .classify_with_outcome(&request, self.model.as_ref())
                .await;
            SiteReport::classified(url, company, classification).with_product(product)
        }
        .instrument(span)
        .await
    }
}
