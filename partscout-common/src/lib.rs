//! Common types and utilities shared across partscout crates.
//!
//! This crate defines the runtime configuration handed to the scrape
//! orchestrator, the shared error type, and observability helpers. It stays
//! dependency‑light so every crate in the workspace can depend on it.
//!
//! # Overview
//!
//! - [`LlmConfig`]: provider‑agnostic model configuration
//! - [`BrowserConfig`] and [`BrowsingPolicy`]: WebDriver endpoint plus the
//!   timing policy (timeouts, human‑like pauses, pacing, caps)
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`ScoutError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use partscout_common::BrowsingPolicy;
//! use std::time::Duration;
//!
//! let policy = BrowsingPolicy::default();
//! assert_eq!(policy.search_timeout(), Duration::from_secs(30));
//! assert_eq!(policy.item_timeout(), Duration::from_secs(45));
//! assert_eq!(policy.max_candidates, 10);
//! ```
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod observability;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Configuration for the model that performs structured extraction.
///
/// The OpenAI key is optional here because every scrape job carries its own
/// `api_key`, which takes precedence over anything configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Openai {
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
        #[serde(default)]
        max_tokens: Option<u32>,
    },
    Ollama {
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default = "default_ollama_endpoint")]
        endpoint: String,
    },
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::Openai {
            api_key: None,
            model: default_openai_model(),
            endpoint: default_openai_endpoint(),
            max_tokens: None,
        }
    }
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_openai_endpoint() -> String {
    DEFAULT_OPENAI_ENDPOINT.into()
}
fn default_ollama_model() -> String {
    DEFAULT_OLLAMA_MODEL.into()
}
fn default_ollama_endpoint() -> String {
    DEFAULT_OLLAMA_ENDPOINT.into()
}

/// Inclusive millisecond range used for randomized, human‑like pauses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PauseRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl PauseRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that never sleeps.
    pub const fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.max_ms == 0
    }
}

/// Timing and volume policy applied to one scrape job.
///
/// Defaults mirror the production behavior: 30s search navigation, 45s item
/// navigation, a 5 minute job deadline, 2–5s/2–4s settle pauses, three lazy‑load
/// scrolls, ~1s pacing between items and at most ten candidates per search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowsingPolicy {
    pub search_timeout_ms: u64,
    pub item_timeout_ms: u64,
    pub job_deadline_ms: u64,
    pub search_settle: PauseRange,
    pub item_settle: PauseRange,
    pub scroll_steps: u32,
    pub scroll_pause: PauseRange,
    pub item_pacing_ms: u64,
    pub max_candidates: usize,
    /// How long the resource count must stay flat before the network is idle.
    pub network_idle_ms: u64,
}

impl Default for BrowsingPolicy {
    fn default() -> Self {
        Self {
            search_timeout_ms: 30_000,
            item_timeout_ms: 45_000,
            job_deadline_ms: 300_000,
            search_settle: PauseRange::new(2_000, 5_000),
            item_settle: PauseRange::new(2_000, 4_000),
            scroll_steps: 3,
            scroll_pause: PauseRange::new(500, 1_500),
            item_pacing_ms: 1_000,
            max_candidates: 10,
            network_idle_ms: 500,
        }
    }
}

impl BrowsingPolicy {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }

    pub fn job_deadline(&self) -> Duration {
        Duration::from_millis(self.job_deadline_ms)
    }

    pub fn item_pacing(&self) -> Duration {
        Duration::from_millis(self.item_pacing_ms)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }
}

/// Where and how to launch the browser engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver endpoint (Chromedriver by default).
    pub webdriver_url: String,
    pub headless: bool,
    pub policy: BrowsingPolicy,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: true,
            policy: BrowsingPolicy::default(),
        }
    }
}

/// Error types used across the partscout system.
///
/// Only [`ScoutError::Validation`] and [`ScoutError::BrowserLifecycle`] ever
/// fail a whole job; the remaining variants are contained to one step or item
/// and degrade into empty product records.
#[derive(thiserror::Error, Debug)]
pub enum ScoutError {
    /// The job description was missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// A navigation returned a non‑2xx status, timed out, or failed outright.
    #[error("Navigation error for {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// The model response was not a schema‑compatible JSON object.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Normalization produced no usable text.
    #[error("No usable content extracted from {0}")]
    EmptyContent(String),

    /// The browser engine failed to launch.
    #[error("Browser lifecycle error: {0}")]
    BrowserLifecycle(String),

    /// The model provider could not be reached or rejected the request.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A driver (browser, network, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

impl ScoutError {
    pub fn navigation(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenient alias for results that use [`ScoutError`].
pub type Result<T> = std::result::Result<T, ScoutError>;
