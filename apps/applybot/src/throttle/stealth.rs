//! Cosmetic human-like behaviour layered on top of the throttle when stealth is on.
//! Nothing here changes control flow; browser faults are swallowed.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::browser::Browser;

#[derive(Debug, Clone, Copy)]
pub struct Humanizer {
    enabled: bool,
}

impl Humanizer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Maybe scroll around, then "read" for a few seconds. Runs before apply actions.
    pub async fn page_behavior(&self, browser: &dyn Browser) {
        if !self.enabled {
            return;
        }
        if rand::thread_rng().gen_bool(0.5) {
            self.random_scroll(browser).await;
        }
        sleep_between(2.0, 6.0).await;
    }

    pub async fn random_scroll(&self, browser: &dyn Browser) {
        if !self.enabled {
            return;
        }
        for (dy, pause) in scroll_plan() {
            if let Err(e) = browser.scroll_by(dy).await {
                debug!("Stealth scroll skipped: {}", e);
                return;
            }
            tokio::time::sleep(pause).await;
        }
    }

    pub async fn before_click(&self) {
        if self.enabled {
            sleep_between(0.2, 0.6).await;
        }
    }

    pub async fn random_pause(&self) {
        if self.enabled {
            sleep_between(0.5, 2.5).await;
        }
    }
}

/// One or two scroll moves drawn from down/up/down, each followed by a short pause.
fn scroll_plan() -> Vec<(i64, Duration)> {
    let mut rng = rand::thread_rng();
    let moves = [
        rng.gen_range(100..=400),
        -rng.gen_range(50..=200),
        rng.gen_range(200..=500),
    ];
    let count = rng.gen_range(1..=2);
    moves
        .choose_multiple(&mut rng, count)
        .copied()
        .collect::<Vec<i64>>()
        .into_iter()
        .map(|dy| (dy, Duration::from_secs_f64(rng.gen_range(0.3..0.8))))
        .collect()
}

async fn sleep_between(low: f64, high: f64) {
    let secs = rand::thread_rng().gen_range(low..high);
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_helpers::FakeBrowser;

    #[test]
    fn test_scroll_plan_bounds() {
        for _ in 0..100 {
            let plan = scroll_plan();
            assert!((1..=2).contains(&plan.len()));
            for (dy, pause) in plan {
                assert!((100..=500).contains(&dy.abs()) || (50..=200).contains(&-dy));
                assert!(pause >= Duration::from_millis(300) && pause < Duration::from_millis(800));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_humanizer_touches_nothing() {
        let browser = FakeBrowser::new();
        let started = tokio::time::Instant::now();
        let h = Humanizer::new(false);
        h.page_behavior(&browser).await;
        h.before_click().await;
        h.random_pause().await;
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(browser.scrolls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_behavior_reads_for_two_to_six_seconds() {
        let browser = FakeBrowser::new();
        let started = tokio::time::Instant::now();
        Humanizer::new(true).page_behavior(&browser).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        // Reading pause plus at most two scroll pauses.
        assert!(elapsed < Duration::from_secs(8));
    }
}
