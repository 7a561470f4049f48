use crate::scout_browser::stealth::realistic_headers;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";
pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Identity presented by one browsing context.
pub struct ContextFingerprint {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub locale: String,
    pub timezone: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
/// Hands out a fresh jittered fingerprint per context around a fixed identity.
pub struct FingerprintRotator {
    base: (u32, u32),
    jitter: (u32, u32),
}

impl Default for FingerprintRotator {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintRotator {
    /// 1920×1080 with ±100×±50 jitter.
    pub fn new() -> Self {
        Self {
            base: (1920, 1080),
            jitter: (100, 50),
        }
    }

    /// A jittered window size for engine launch.
    pub fn window_size(&self) -> (u32, u32) {
        (
            jittered(self.base.0, self.jitter.0),
            jittered(self.base.1, self.jitter.1),
        )
    }

    /// A new fingerprint; the viewport is re-jittered on every call.
    pub fn next_context(&self) -> ContextFingerprint {
        ContextFingerprint {
            user_agent: DESKTOP_USER_AGENT.to_string(),
            viewport: self.window_size(),
            locale: DEFAULT_LOCALE.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            headers: realistic_headers(),
        }
    }
}

fn jittered(base: u32, jitter: u32) -> u32 {
    let delta = OsRng.gen_range(-(jitter as i64)..=jitter as i64);
    (base as i64 + delta).max(1) as u32
}
