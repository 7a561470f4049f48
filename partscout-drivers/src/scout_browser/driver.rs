use crate::scout_browser::{
    engine::{BrowserEngine, BrowserLauncher, BrowsingContext, LaunchOptions},
    fingerprint::ContextFingerprint,
    page::WebDriverContext,
    stealth::build_hardening_arguments,
};
use anyhow::{anyhow, bail, Context as _, Result};
use async_trait::async_trait;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use futures::future::join_all;
use partscout_http::HttpClient;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use webdriver::capabilities::Capabilities;

/// Open sessions keyed by context id, so the engine can close contexts whose
/// owners were dropped mid-navigation.
pub(crate) type SessionRegistry = Arc<Mutex<HashMap<u64, Client>>>;

const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    value: StatusValue,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    message: String,
}

/// Launches engines against a running WebDriver service.
///
/// Default endpoint is `http://localhost:9515` (Chromedriver).
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    webdriver_url: String,
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
        }
    }

    /// Check `/status` so an unreachable driver fails the launch, not the
    /// first navigation.
    pub async fn check_status(&self) -> Result<()> {
        let client = HttpClient::new(&self.webdriver_url)?
            .with_timeout(STATUS_TIMEOUT)
            .with_retries(0);
        let status: StatusEnvelope = client
            .get_json("status", None)
            .await
            .with_context(|| format!("WebDriver at {} is unreachable", self.webdriver_url))?;
        if !status.value.ready {
            bail!(
                "WebDriver at {} is not ready: {}",
                self.webdriver_url,
                status.value.message
            );
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserEngine>> {
        self.check_status().await?;
        info!(
            target: "browser.context",
            webdriver_url = %self.webdriver_url,
            headless = options.headless,
            window = ?options.window,
            "browser engine ready"
        );
        Ok(Box::new(WebDriverEngine::new(
            self.webdriver_url.clone(),
            options.clone(),
        )))
    }
}

/// One engine per job. Every context is its own WebDriver session, which
/// gives full cookie and storage isolation.
pub struct WebDriverEngine {
    webdriver_url: String,
    options: LaunchOptions,
    sessions: SessionRegistry,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl WebDriverEngine {
    pub fn new(webdriver_url: String, options: LaunchOptions) -> Self {
        Self {
            webdriver_url,
            options,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    fn capabilities(&self, fingerprint: &ContextFingerprint) -> Capabilities {
        let mut caps = Capabilities::new();
        let args = build_hardening_arguments(
            self.options.window,
            &fingerprint.user_agent,
            &fingerprint.locale,
            self.options.headless,
        );
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": args,
                "excludeSwitches": ["enable-automation"],
            }),
        );
        caps
    }

    /// Number of sessions not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl BrowserEngine for WebDriverEngine {
    async fn new_context(
        &self,
        fingerprint: &ContextFingerprint,
    ) -> Result<Box<dyn BrowsingContext>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(anyhow!("engine already closed"));
        }

        let client = ClientBuilder::native()
            .capabilities(self.capabilities(fingerprint))
            .connect(&self.webdriver_url)
            .await
            .with_context(|| format!("failed to open session on {}", self.webdriver_url))?;

        let timeouts =
            TimeoutConfiguration::new(None, Some(self.options.page_load_timeout), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            warn!(target: "browser.context", error = %e, "could not set page load timeout");
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, client.clone());

        let mut context =
            WebDriverContext::new(id, client, self.sessions.clone(), self.options.network_idle);
        context.apply_fingerprint(fingerprint).await;

        debug!(
            target: "browser.context",
            id,
            viewport = ?fingerprint.viewport,
            "context opened"
        );
        Ok(Box::new(context))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let open: Vec<(u64, Client)> = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        let results = join_all(
            open.into_iter()
                .map(|(id, client)| async move { (id, client.close().await) }),
        )
        .await;

        let mut failures = 0usize;
        for (id, result) in results {
            match result {
                Ok(()) => debug!(target: "browser.teardown", id, "session closed"),
                Err(e) => {
                    failures += 1;
                    warn!(target: "browser.teardown", id, error = %e, "failed to close session");
                }
            }
        }
        if failures > 0 {
            bail!("{failures} browser session(s) failed to close");
        }
        Ok(())
    }
}
