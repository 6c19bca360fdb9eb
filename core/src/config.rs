//! Engine tuning knobs.
//!
//! Defaults mirror the deployed policy; a JSON file can override them
//! for a specific installation.

use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cosine-similarity threshold for a duplicate match.
    pub similarity_threshold: f32,
    /// Token-overlap threshold on the degraded fallback path.
    pub fallback_threshold: f32,
    /// Trailing window of complaints considered as duplicate candidates.
    pub candidate_window_days: i64,
    /// Bound on the candidate set per scan.
    pub candidate_limit: u32,
    /// Smaller sample used by the token-overlap fallback.
    pub fallback_candidate_limit: u32,
    /// Lat/lng delta treated as "same area" (~500m).
    pub hotspot_geo_delta: f64,
    /// Similar nearby complaints needed before a hotspot is declared.
    pub hotspot_min_neighbors: usize,
    /// Minimum gap between two escalations of the same complaint.
    pub escalation_cooldown_minutes: i64,
    /// Sweep cadence for the external timer.
    pub sweep_interval_minutes: i64,
    /// Delay before the immediate post-start sweep.
    pub startup_sweep_delay_seconds: u64,
    /// Hard ceiling on escalation_level.
    pub max_escalation_level: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            fallback_threshold: 0.6,
            candidate_window_days: 30,
            candidate_limit: 100,
            fallback_candidate_limit: 50,
            hotspot_geo_delta: 0.005,
            hotspot_min_neighbors: 2,
            escalation_cooldown_minutes: 60,
            sweep_interval_minutes: 60,
            startup_sweep_delay_seconds: 5,
            max_escalation_level: 3,
        }
    }
}

impl EngineConfig {
    /// Load overrides from a JSON file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn escalation_cooldown(&self) -> Duration {
        Duration::minutes(self.escalation_cooldown_minutes)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_minutes.max(0) as u64 * 60)
    }

    pub fn startup_sweep_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.startup_sweep_delay_seconds)
    }
}
