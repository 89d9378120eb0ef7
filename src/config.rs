//! Tracker configuration

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::capture::CaptureConstraints;
use crate::inference::DetectorOptions;

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Constraint tiers, most specific first
    pub tiers: Vec<CaptureConstraints>,
    /// How long a freshly opened stream may take to deliver its first frame
    pub playable_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            tiers: CaptureConstraints::default_tiers(),
            playable_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub check_interval_ms: u64,
    pub stall_threshold_ms: u64,
    pub summary_interval_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 5_000,
            stall_threshold_ms: 5_000,
            summary_interval_ms: 30_000,
        }
    }
}

impl HealthConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_millis(self.stall_threshold_ms)
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms)
    }
}

/// Everything a [`crate::HandTracker`] needs besides its device and engine.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub capture: CaptureConfig,
    /// Scheduler cadence, usually the display refresh rate
    pub tick_rate_hz: u32,
    pub detector: DetectorOptions,
    pub health: HealthConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            tick_rate_hz: 60,
            detector: DetectorOptions::default(),
            health: HealthConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_rate_hz == 0 {
            bail!("tick_rate_hz must be > 0");
        }
        if self.capture.playable_timeout_ms == 0 {
            bail!("capture.playable_timeout_ms must be > 0");
        }
        if self.health.check_interval_ms == 0 || self.health.summary_interval_ms == 0 {
            bail!("health intervals must be > 0");
        }
        if self.health.stall_threshold_ms == 0 {
            bail!("health.stall_threshold_ms must be > 0");
        }
        if self.detector.num_hands != 1 {
            bail!(
                "detector.num_hands must be 1 (got {})",
                self.detector.num_hands
            );
        }

        let confidences = [
            ("min_hand_detection_confidence", self.detector.min_hand_detection_confidence),
            ("min_hand_presence_confidence", self.detector.min_hand_presence_confidence),
            ("min_tracking_confidence", self.detector.min_tracking_confidence),
        ];
        for (name, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                bail!("detector.{name} must be within [0, 1] (got {value})");
            }
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }

    pub fn playable_timeout(&self) -> Duration {
        Duration::from_millis(self.capture.playable_timeout_ms)
    }
}
