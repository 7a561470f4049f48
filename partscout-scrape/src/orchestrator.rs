//! Per-job browser orchestration.
//!
//! One engine is launched per job and always torn down. The search page and
//! every candidate get their own context. The job deadline bounds search plus
//! items; when it expires, records completed so far are returned as a
//! successful partial batch.

use crate::extract::ExtractionEngine;
use crate::job::ScrapeJob;
use crate::normalize::ContentNormalizer;
use crate::record::{ProductRecord, ScrapeBatchResult};
use crate::sites::{self, SiteProfile};
use partscout_common::{BrowsingPolicy, Result, ScoutError};
use partscout_drivers::scout_browser::behavioral::BehavioralEngine;
use partscout_drivers::scout_browser::{
    BrowserEngine, BrowserLauncher, BrowsingContext, FingerprintRotator, LaunchOptions,
    NavigationOutcome,
};
use partscout_llm::traits::LlmClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(15);

pub struct ScrapeOrchestrator {
    launcher: Arc<dyn BrowserLauncher>,
    extractor: ExtractionEngine,
    normalizer: ContentNormalizer,
    policy: BrowsingPolicy,
    headless: bool,
    behavior: BehavioralEngine,
    fingerprints: FingerprintRotator,
}

impl ScrapeOrchestrator {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        llm: Arc<dyn LlmClient + Send + Sync>,
        policy: BrowsingPolicy,
    ) -> Self {
        Self {
            launcher,
            extractor: ExtractionEngine::new(llm),
            normalizer: ContentNormalizer::new(),
            policy,
            headless: true,
            behavior: BehavioralEngine::new(),
            fingerprints: FingerprintRotator::new(),
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Run one job end to end.
    ///
    /// Only a launch failure is an error; navigation, content and extraction
    /// failures are contained per item.
    pub async fn run(&self, job: &ScrapeJob) -> Result<ScrapeBatchResult> {
        let span = info_span!(
            "scrape_job",
            job_id = %Uuid::new_v4(),
            site = %job.website_url(),
            term = %job.search_term(),
            max_results = job.max_results(),
        );
        self.run_inner(job).instrument(span).await
    }

    async fn run_inner(&self, job: &ScrapeJob) -> Result<ScrapeBatchResult> {
        let options = LaunchOptions {
            headless: self.headless,
            window: self.fingerprints.window_size(),
            network_idle: self.policy.network_idle(),
            page_load_timeout: self.policy.search_timeout().max(self.policy.item_timeout()),
        };
        let engine = self
            .launcher
            .launch(&options)
            .await
            .map_err(|e| ScoutError::BrowserLifecycle(format!("{e:#}")))?;

        let mut records = Vec::new();
        let mut candidates_found = 0usize;
        let timed_out = timeout(
            self.policy.job_deadline(),
            self.drive(engine.as_ref(), job, &mut records, &mut candidates_found),
        )
        .await
        .is_err();

        if timed_out {
            warn!(
                target: "scrape.item",
                completed = records.len(),
                deadline_ms = self.policy.job_deadline_ms,
                "job deadline reached; returning partial batch"
            );
        }

        self.teardown(engine.as_ref()).await;

        info!(
            records = records.len(),
            candidates_found,
            timed_out,
            "scrape job finished"
        );
        Ok(ScrapeBatchResult {
            records,
            timed_out,
            candidates_found,
        })
    }

    async fn drive(
        &self,
        engine: &dyn BrowserEngine,
        job: &ScrapeJob,
        records: &mut Vec<ProductRecord>,
        candidates_found: &mut usize,
    ) {
        let profile = sites::resolve(job.website_url());
        let search_url = profile.search_url(job.website_url(), job.search_term());
        info!(target: "scrape.search", profile = profile.id, url = %search_url, "searching");

        let candidates = match self.search(engine, profile, &search_url, job).await {
            Ok(found) => found,
            Err(e) => {
                warn!(target: "scrape.search", url = %search_url, error = %e, "search failed; no candidates");
                Vec::new()
            }
        };
        *candidates_found = candidates.len();
        if candidates.is_empty() {
            warn!(target: "scrape.search", term = %job.search_term(), "no search results found");
        }

        for (index, url) in candidates.iter().take(job.max_results()).enumerate() {
            if index > 0 && !self.policy.item_pacing().is_zero() {
                sleep(self.policy.item_pacing()).await;
            }
            let record = match self.scrape_item(engine, url).await {
                Ok(record) => {
                    info!(target: "scrape.item", index, %url, "scraped");
                    record
                }
                Err(e) => {
                    warn!(target: "scrape.item", index, %url, error = %e, "item failed; recording empty product");
                    ProductRecord::empty()
                }
            };
            records.push(record);
        }
    }

    async fn search(
        &self,
        engine: &dyn BrowserEngine,
        profile: &SiteProfile,
        search_url: &str,
        job: &ScrapeJob,
    ) -> Result<Vec<String>> {
        let mut context = engine.new_context(&self.fingerprints.next_context()).await?;
        let result = self
            .read_search_page(context.as_mut(), profile, search_url, job)
            .await;
        close_context(context.as_mut(), search_url).await;
        result
    }

    async fn read_search_page(
        &self,
        context: &mut dyn BrowsingContext,
        profile: &SiteProfile,
        search_url: &str,
        job: &ScrapeJob,
    ) -> Result<Vec<String>> {
        navigate(context, search_url, self.policy.search_timeout()).await?;
        self.behavior.pause(self.policy.search_settle).await;

        let html = context.content().await?;
        let candidates = sites::discover_candidates(
            &html,
            job.website_url(),
            profile,
            self.policy.max_candidates,
        );
        info!(target: "scrape.search", count = candidates.len(), "candidates discovered");
        Ok(candidates)
    }

    async fn scrape_item(&self, engine: &dyn BrowserEngine, url: &str) -> Result<ProductRecord> {
        let mut context = engine.new_context(&self.fingerprints.next_context()).await?;
        let captured = self.capture_item(context.as_mut(), url).await;
        close_context(context.as_mut(), url).await;
        let html = captured?;

        let text = self.normalizer.normalize(&html, url);
        if text.is_empty() {
            return Err(ScoutError::EmptyContent(url.to_string()));
        }
        Ok(self.extractor.extract(&text, url).await)
    }

    async fn capture_item(&self, context: &mut dyn BrowsingContext, url: &str) -> Result<String> {
        navigate(context, url, self.policy.item_timeout()).await?;

        for _ in 0..self.policy.scroll_steps {
            context.scroll_by(self.behavior.scroll_offset()).await?;
            self.behavior.pause(self.policy.scroll_pause).await;
        }
        self.behavior.pause(self.policy.item_settle).await;

        Ok(context.content().await?)
    }

    async fn teardown(&self, engine: &dyn BrowserEngine) {
        match timeout(TEARDOWN_TIMEOUT, engine.close()).await {
            Ok(Ok(())) => debug!(target: "browser.teardown", "engine closed"),
            Ok(Err(e)) => warn!(target: "browser.teardown", error = %format!("{e:#}"), "engine close failed"),
            Err(_) => warn!(target: "browser.teardown", "engine close timed out"),
        }
    }
}

/// Navigate under `limit`; timeouts, driver errors and non-2xx statuses all
/// become [`ScoutError::Navigation`].
///
/// The driver's own page load limit is set to the same step timeout first.
async fn navigate(
    context: &mut dyn BrowsingContext,
    url: &str,
    limit: Duration,
) -> Result<NavigationOutcome> {
    if let Err(e) = context.set_page_load_timeout(limit).await {
        warn!(target: "browser.context", %url, error = %format!("{e:#}"), "could not set page load timeout");
    }

    let outcome = timeout(limit, context.navigate(url))
        .await
        .map_err(|_| ScoutError::navigation(url, format!("timed out after {}ms", limit.as_millis())))?
        .map_err(|e| ScoutError::navigation(url, format!("{e:#}")))?;

    if !outcome.is_success() {
        let status = outcome.status.unwrap_or_default();
        return Err(ScoutError::navigation(url, format!("HTTP {status}")));
    }
    Ok(outcome)
}

async fn close_context(context: &mut dyn BrowsingContext, url: &str) {
    if let Err(e) = context.close().await {
        warn!(target: "browser.teardown", %url, error = %format!("{e:#}"), "context close failed");
    }
}
