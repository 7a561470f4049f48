use crate::scout_browser::{
    driver::SessionRegistry,
    engine::{BrowsingContext, NavigationOutcome},
    fingerprint::ContextFingerprint,
    stealth::StealthScripts,
};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use fantoccini::wd::{TimeoutConfiguration, WebDriverCompatibleCommand};
use fantoccini::Client;
use serde_json::{json, Map, Value};
use std::sync::PoisonError;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

const IDLE_POLL: Duration = Duration::from_millis(250);

const IDLE_STATE: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

const NAVIGATION_STATUS: &str = r#"
    const nav = performance.getEntriesByType('navigation')[0];
    return nav && typeof nav.responseStatus === 'number' ? nav.responseStatus : 0;
"#;

/// Chromedriver's CDP passthrough (`goog/cdp/execute`).
#[derive(Debug, Clone)]
pub struct CdpCommand {
    cmd: String,
    params: Value,
}

impl CdpCommand {
    pub fn new(cmd: impl Into<String>, params: Value) -> Self {
        Self {
            cmd: cmd.into(),
            params,
        }
    }
}

impl WebDriverCompatibleCommand for CdpCommand {
    fn endpoint(
        &self,
        base_url: &url::Url,
        session_id: Option<&str>,
    ) -> std::result::Result<url::Url, url::ParseError> {
        let session = session_id.unwrap_or_default();
        base_url.join(&format!("session/{session}/goog/cdp/execute"))
    }

    fn method_and_body(&self, _request_url: &url::Url) -> (http::Method, Option<String>) {
        let body = json!({ "cmd": self.cmd, "params": self.params }).to_string();
        (http::Method::POST, Some(body))
    }
}

/// One WebDriver session used as an isolated browsing context.
pub struct WebDriverContext {
    id: u64,
    client: Client,
    sessions: SessionRegistry,
    network_idle: Duration,
    init_script_installed: bool,
    closed: bool,
}

impl WebDriverContext {
    pub(crate) fn new(
        id: u64,
        client: Client,
        sessions: SessionRegistry,
        network_idle: Duration,
    ) -> Self {
        Self {
            id,
            client,
            sessions,
            network_idle,
            init_script_installed: false,
            closed: false,
        }
    }

    /// Apply the fingerprint through CDP. Drivers without CDP fall back to
    /// running the evasions after each load.
    pub(crate) async fn apply_fingerprint(&mut self, fingerprint: &ContextFingerprint) {
        let (width, height) = fingerprint.viewport;
        if let Err(e) = self.client.set_window_size(width, height).await {
            warn!(target: "browser.context", id = self.id, error = %e, "set_window_size failed");
        }

        let headers: Map<String, Value> = fingerprint
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let setup = [
            CdpCommand::new(
                "Page.addScriptToEvaluateOnNewDocument",
                json!({ "source": StealthScripts::core_evasions() }),
            ),
            CdpCommand::new(
                "Emulation.setTimezoneOverride",
                json!({ "timezoneId": fingerprint.timezone }),
            ),
            CdpCommand::new(
                "Emulation.setLocaleOverride",
                json!({ "locale": fingerprint.locale }),
            ),
            CdpCommand::new("Network.enable", json!({})),
            CdpCommand::new("Network.setExtraHTTPHeaders", json!({ "headers": headers })),
        ];

        for (i, cmd) in setup.into_iter().enumerate() {
            let name = cmd.cmd.clone();
            match self.client.issue_cmd(cmd).await {
                Ok(_) => {
                    if i == 0 {
                        self.init_script_installed = true;
                    }
                }
                Err(e) => {
                    warn!(
                        target: "browser.context",
                        id = self.id,
                        command = %name,
                        error = %e,
                        "CDP command unavailable"
                    );
                }
            }
        }
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        let mut last_count: Option<u64> = None;
        let mut quiet_since = Instant::now();
        loop {
            let state = self.client.execute(IDLE_STATE, vec![]).await?;
            let complete = state.get(0).and_then(Value::as_str) == Some("complete");
            let count = state.get(1).and_then(Value::as_u64);

            if !complete || count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= self.network_idle {
                return Ok(());
            }
            sleep(IDLE_POLL).await;
        }
    }

    async fn observed_status(&self) -> Option<u16> {
        self.client
            .execute(NAVIGATION_STATUS, vec![])
            .await
            .ok()
            .and_then(|v| v.as_u64())
            .filter(|s| *s > 0)
            .and_then(|s| u16::try_from(s).ok())
    }
}

#[async_trait]
impl BrowsingContext for WebDriverContext {
    async fn set_page_load_timeout(&mut self, limit: Duration) -> Result<()> {
        self.client
            .update_timeouts(TimeoutConfiguration::new(None, Some(limit), None))
            .await
            .context("update page load timeout")?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationOutcome> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;

        if !self.init_script_installed {
            self.client
                .execute(StealthScripts::core_evasions(), vec![])
                .await?;
        }

        self.wait_for_network_idle().await?;

        let status = self.observed_status().await;
        let final_url = self
            .client
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        debug!(target: "browser.context", id = self.id, ?status, %final_url, "navigated");
        Ok(NavigationOutcome { status, final_url })
    }

    async fn scroll_by(&mut self, dy: i64) -> Result<()> {
        self.client
            .execute("window.scrollBy(0, arguments[0]);", vec![json!(dy)])
            .await?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.client.source().await.map_err(anyhow::Error::from)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let client = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        if let Some(client) = client {
            client.close().await?;
            debug!(target: "browser.context", id = self.id, "context closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdp_command_targets_session_passthrough() {
        let cmd = CdpCommand::new("Emulation.setTimezoneOverride", json!({"timezoneId": "UTC"}));
        let base = url::Url::parse("http://localhost:9515/").unwrap();
        let endpoint = cmd.endpoint(&base, Some("abc123")).unwrap();
        assert_eq!(
            endpoint.as_str(),
            "http://localhost:9515/session/abc123/goog/cdp/execute"
        );

        let (method, body) = cmd.method_and_body(&endpoint);
        assert_eq!(method, http::Method::POST);
        let body: Value = serde_json::from_str(&body.unwrap()).unwrap();
        assert_eq!(body["cmd"], "Emulation.setTimezoneOverride");
        assert_eq!(body["params"]["timezoneId"], "UTC");
    }
}
