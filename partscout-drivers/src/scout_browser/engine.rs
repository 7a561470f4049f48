//! Engine abstraction the orchestrator drives.
//!
//! A [`BrowserLauncher`] starts one [`BrowserEngine`] per job. The engine hands
//! out isolated [`BrowsingContext`]s, one per navigation target, and must be
//! able to close every context it ever opened even when the caller dropped a
//! future mid-navigation.

use crate::scout_browser::fingerprint::ContextFingerprint;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Engine-wide launch parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Jittered window size applied to every context unless it sets its own.
    pub window: (u32, u32),
    /// How long network activity must stay quiet after load.
    pub network_idle: Duration,
    /// Upper bound the engine may enforce on a single page load.
    pub page_load_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window: (1920, 1080),
            network_idle: Duration::from_millis(500),
            page_load_timeout: Duration::from_secs(45),
        }
    }
}

/// What a completed navigation reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOutcome {
    /// Main document HTTP status when the engine can observe it.
    pub status: Option<u16>,
    pub final_url: String,
}

impl NavigationOutcome {
    /// An unobservable status counts as success; anything outside 2xx does not.
    pub fn is_success(&self) -> bool {
        self.status.map_or(true, |s| (200..300).contains(&s))
    }
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start an engine for one job.
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserEngine>>;
}

#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Open a fresh context that shares no cookies or storage with others.
    async fn new_context(&self, fingerprint: &ContextFingerprint)
        -> Result<Box<dyn BrowsingContext>>;

    /// Close every still-open context and release the engine.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait BrowsingContext: Send + Sync {
    /// Bound the driver-side page load for the next navigations, so a load
    /// abandoned by the caller's own timeout does not keep the session busy.
    async fn set_page_load_timeout(&mut self, limit: Duration) -> Result<()>;

    /// Navigate and wait for DOM-ready followed by network idle.
    async fn navigate(&mut self, url: &str) -> Result<NavigationOutcome>;

    /// Scroll the viewport vertically by `dy` pixels.
    async fn scroll_by(&mut self, dy: i64) -> Result<()>;

    /// Rendered HTML of the current document.
    async fn content(&mut self) -> Result<String>;

    /// Close the context. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}
