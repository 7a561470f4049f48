use partscout_common::PauseRange;
use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

const SCROLL_MIN_PX: i64 = 100;
const SCROLL_MAX_PX: i64 = 700;

#[derive(Debug, Clone, Default)]
/// Produces human‑like delays and scroll distances to reduce automation signals.
pub struct BehavioralEngine {}

impl BehavioralEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// Sleep for a random duration within `range`. Zero ranges return at once.
    pub async fn pause(&self, range: PauseRange) {
        let ms = Self::sample(range);
        if ms > 0 {
            sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Random downward scroll distance for lazy-load triggering.
    pub fn scroll_offset(&self) -> i64 {
        OsRng.gen_range(SCROLL_MIN_PX..=SCROLL_MAX_PX)
    }

    fn sample(range: PauseRange) -> u64 {
        if range.is_zero() {
            return 0;
        }
        let lo = range.min_ms.min(range.max_ms);
        let hi = range.min_ms.max(range.max_ms);
        OsRng.gen_range(lo..=hi)
    }
}
