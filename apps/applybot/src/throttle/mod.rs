//! Throttle model: speed sliders to wait durations.
//!
//! Each slider (1..=100) maps through a step table to a multiplier on a base delay:
//!
//! | slider | multiplier |
//! |--------|-----------|
//! | ≥95    | 0.02      |
//! | ≥75    | 0.15      |
//! | ≥50    | 0.4       |
//! | ≥25    | 0.8       |
//! | else   | 1.5       |
//!
//! The result is floored so no wait is ever zero. Stealth adds a uniform jitter on top.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use crate::models::snapshot::ConfigurationSnapshot;

pub mod stealth;

pub use stealth::Humanizer;

const JITTER_RANGE: (f64, f64) = (0.8, 1.3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Page loads and result scanning.
    Scan,
    /// Form filling and clicks.
    Apply,
}

pub fn multiplier(speed: u8) -> f64 {
    if speed >= 95 {
        0.02
    } else if speed >= 75 {
        0.15
    } else if speed >= 50 {
        0.4
    } else if speed >= 25 {
        0.8
    } else {
        1.5
    }
}

fn floor_secs(speed: u8, pace: Pace) -> f64 {
    match (pace, speed >= 95) {
        (Pace::Scan, true) => 0.05,
        (Pace::Scan, false) => 0.1,
        (Pace::Apply, true) => 0.02,
        (Pace::Apply, false) => 0.05,
    }
}

#[derive(Debug, Clone)]
pub struct Throttle {
    scan_speed: u8,
    apply_speed: u8,
    stealth: bool,
    cooldown: Duration,
}

impl Throttle {
    pub fn new(scan_speed: u8, apply_speed: u8, stealth: bool, cooldown: Duration) -> Self {
        Self {
            scan_speed,
            apply_speed,
            stealth,
            cooldown,
        }
    }

    pub fn from_snapshot(snapshot: &ConfigurationSnapshot) -> Self {
        Self::new(
            snapshot.scan_speed,
            snapshot.apply_speed,
            snapshot.stealth,
            Duration::from_secs(snapshot.cooldown_secs),
        )
    }

    pub fn stealth(&self) -> bool {
        self.stealth
    }

    fn speed(&self, pace: Pace) -> u8 {
        match pace {
            Pace::Scan => self.scan_speed,
            Pace::Apply => self.apply_speed,
        }
    }

    /// Deterministic part of a wait: `base × multiplier`, floored.
    pub fn base_delay(&self, base_secs: f64, pace: Pace) -> Duration {
        let speed = self.speed(pace);
        let secs = (base_secs * multiplier(speed)).max(floor_secs(speed, pace));
        Duration::from_secs_f64(secs)
    }

    /// The wait actually slept, jittered when stealth is on.
    pub fn delay(&self, base_secs: f64, pace: Pace) -> Duration {
        let delay = self.base_delay(base_secs, pace);
        if self.stealth {
            let factor = rand::thread_rng().gen_range(JITTER_RANGE.0..JITTER_RANGE.1);
            delay.mul_f64(factor)
        } else {
            delay
        }
    }

    pub async fn wait(&self, base_secs: f64, pace: Pace) {
        let delay = self.delay(base_secs, pace);
        tokio::time::sleep(delay).await;
    }

    /// Short extra pause between scan steps; skipped entirely at high scan speed.
    pub async fn scan_step(&self) {
        let secs = if self.scan_speed >= 90 {
            return;
        } else if self.scan_speed >= 75 {
            0.1
        } else if self.scan_speed >= 50 {
            0.3
        } else {
            0.6
        };
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    /// Fixed post-attempt cooldown, applied regardless of stealth.
    pub async fn cooldown(&self) {
        if self.cooldown.is_zero() {
            return;
        }
        info!("Cooldown: waiting {}s before next job", self.cooldown.as_secs());
        tokio::time::sleep(self.cooldown).await;
    }

    /// How long to keep looking for an element before giving up.
    pub fn element_timeout(&self) -> Duration {
        if self.scan_speed >= 90 {
            Duration::from_secs(3)
        } else if self.scan_speed >= 50 {
            Duration::from_secs(8)
        } else {
            Duration::from_secs(15)
        }
    }

    /// WebDriver implicit wait for element lookups.
    pub fn implicit_wait(&self) -> Duration {
        let wait = if self.scan_speed >= 90 {
            Duration::from_millis(100)
        } else if self.scan_speed >= 50 {
            Duration::from_secs(1)
        } else {
            Duration::from_secs(3)
        };
        debug!("Implicit wait {}ms at scan speed {}", wait.as_millis(), self.scan_speed);
        wait
    }

    pub fn page_load_timeout(&self) -> Duration {
        self.element_timeout() * 4
    }
}
