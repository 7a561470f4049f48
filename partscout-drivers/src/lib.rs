//! Driver layer for browser automation.
//!
//! This crate exposes the browser engine abstraction the scrape orchestrator
//! drives, plus its WebDriver (Chromedriver) implementation.
//!
//! - [`scout_browser::engine`]: `BrowserLauncher` / `BrowserEngine` /
//!   `BrowsingContext` traits and navigation outcome types
//! - [`scout_browser::driver::WebDriverLauncher`]: WebDriver-backed engine
//! - [`scout_browser::page::WebDriverContext`]: one isolated session per target
//! - [`scout_browser::behavioral::BehavioralEngine`]: human‑like pauses and scrolls
//! - [`scout_browser::fingerprint`]: per-context fingerprint rotation
//! - [`scout_browser::stealth`]: hardening flags, headers and init scripts
pub mod scout_browser;
