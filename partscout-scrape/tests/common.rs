#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use partscout_common::{BrowsingPolicy, PauseRange, ScoutError};
use partscout_drivers::scout_browser::{
    BrowserEngine, BrowserLauncher, BrowsingContext, ContextFingerprint, LaunchOptions,
    NavigationOutcome,
};
use partscout_llm::traits::{LlmClient, LlmResponse};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PRODUCT_JSON: &str = r#"{
    "product_name": "Arduino Uno R3",
    "price": "$23.00",
    "condition": "new",
    "confidence_score": 0.92
}"#;

/// Policy with every pause zeroed so tests run at navigation speed.
pub fn instant_policy() -> BrowsingPolicy {
    BrowsingPolicy {
        search_settle: PauseRange::none(),
        item_settle: PauseRange::none(),
        scroll_pause: PauseRange::none(),
        item_pacing_ms: 0,
        network_idle_ms: 0,
        ..BrowsingPolicy::default()
    }
}

pub fn product_page(title: &str) -> String {
    format!(
        r#"<html><body>
            <nav>Home / Electronics</nav>
            <div class="product-details">{title} development board. Ships worldwide from Italy</div>
            <footer>Cookie policy and legal text</footer>
        </body></html>"#
    )
}

pub fn search_page(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|h| format!(r#"<li><a href="{h}">result</a></li>"#))
        .collect();
    format!("<html><body><ul>{anchors}</ul></body></html>")
}

#[derive(Clone)]
struct MockPage {
    status: Option<u16>,
    html: String,
    delay: Duration,
    broken: bool,
}

#[derive(Default)]
pub struct BrowserStats {
    pub launches: AtomicUsize,
    pub contexts_opened: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    pub engine_closes: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    page_load_limits: Mutex<Vec<Duration>>,
    open: Mutex<HashSet<u64>>,
    next_id: AtomicU64,
}

impl BrowserStats {
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn page_load_limits(&self) -> Vec<Duration> {
        self.page_load_limits.lock().unwrap().clone()
    }

    pub fn open_contexts(&self) -> usize {
        self.open.lock().unwrap().len()
    }

    pub fn opened(&self) -> usize {
        self.contexts_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.contexts_closed.load(Ordering::SeqCst)
    }
}

/// In-memory browser: URLs map to canned pages, unknown URLs render a 404.
pub struct MockLauncher {
    pages: HashMap<String, MockPage>,
    fail_launch: bool,
    pub stats: Arc<BrowserStats>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            fail_launch: false,
            stats: Arc::new(BrowserStats::default()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new()
        }
    }

    pub fn page(self, url: &str, html: impl Into<String>) -> Self {
        self.page_with(url, Some(200), html, Duration::ZERO)
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.page_with(url, Some(status), "<html><body>Error</body></html>", Duration::ZERO)
    }

    pub fn slow_page(self, url: &str, html: impl Into<String>, delay: Duration) -> Self {
        self.page_with(url, Some(200), html, delay)
    }

    /// Navigation fails outright, as on a reset connection.
    pub fn broken(mut self, url: &str) -> Self {
        self = self.page_with(url, None, "", Duration::ZERO);
        if let Some(page) = self.pages.get_mut(url) {
            page.broken = true;
        }
        self
    }

    fn page_with(
        mut self,
        url: &str,
        status: Option<u16>,
        html: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.pages.insert(
            url.to_string(),
            MockPage {
                status,
                html: html.into(),
                delay,
                broken: false,
            },
        );
        self
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn BrowserEngine>> {
        if self.fail_launch {
            anyhow::bail!("chromedriver not reachable");
        }
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockEngine {
            pages: Arc::new(self.pages.clone()),
            stats: self.stats.clone(),
        }))
    }
}

struct MockEngine {
    pages: Arc<HashMap<String, MockPage>>,
    stats: Arc<BrowserStats>,
}

#[async_trait]
impl BrowserEngine for MockEngine {
    async fn new_context(
        &self,
        fingerprint: &ContextFingerprint,
    ) -> Result<Box<dyn BrowsingContext>> {
        assert_eq!(fingerprint.locale, "en-US");
        let id = self.stats.next_id.fetch_add(1, Ordering::SeqCst);
        self.stats.open.lock().unwrap().insert(id);
        self.stats.contexts_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockContext {
            id,
            pages: self.pages.clone(),
            stats: self.stats.clone(),
            html: String::new(),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.stats.engine_closes.fetch_add(1, Ordering::SeqCst);
        let orphans = self.stats.open.lock().unwrap().drain().count();
        self.stats
            .contexts_closed
            .fetch_add(orphans, Ordering::SeqCst);
        Ok(())
    }
}

struct MockContext {
    id: u64,
    pages: Arc<HashMap<String, MockPage>>,
    stats: Arc<BrowserStats>,
    html: String,
}

#[async_trait]
impl BrowsingContext for MockContext {
    async fn set_page_load_timeout(&mut self, limit: Duration) -> Result<()> {
        self.stats.page_load_limits.lock().unwrap().push(limit);
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationOutcome> {
        self.stats.navigations.lock().unwrap().push(url.to_string());
        let page = self.pages.get(url).cloned().unwrap_or(MockPage {
            status: Some(404),
            html: "<html><body>Not found</body></html>".to_string(),
            delay: Duration::ZERO,
            broken: false,
        });
        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }
        if page.broken {
            anyhow::bail!("net::ERR_CONNECTION_RESET at {url}");
        }
        self.html = page.html;
        Ok(NavigationOutcome {
            status: page.status,
            final_url: url.to_string(),
        })
    }

    async fn scroll_by(&mut self, dy: i64) -> Result<()> {
        assert!((100..=700).contains(&dy));
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn close(&mut self) -> Result<()> {
        if self.stats.open.lock().unwrap().remove(&self.id) {
            self.stats.contexts_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Model stub that answers every prompt with the same text.
pub struct MockLlm {
    reply: String,
    pub calls: AtomicUsize,
}

impl MockLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> partscout_common::Result<LlmResponse> {
        if !prompt.contains("CONTENT TO ANALYZE") {
            return Err(ScoutError::Llm("unexpected prompt".into()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            text: self.reply.clone(),
            model: Some("mock".into()),
            tokens_used: None,
        })
    }

    async fn health_check(&self) -> partscout_common::Result<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
