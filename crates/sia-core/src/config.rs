//! Engine configuration loaded from the environment.
//!
//! Mirrors the teacher's `SovereignConfig::from_env()` idiom: small
//! `env_*` helpers, defaults baked into the struct, no panics on bad input.

use serde::{Deserialize, Serialize};

fn default_world_model_path() -> String {
    "data/world_model.json".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_problem_score_threshold() -> f64 {
    0.5
}

fn default_baseline_window_weeks() -> u32 {
    3
}

fn default_snooze_days() -> i64 {
    7
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_max_requests() -> u32 {
    100
}

fn default_processed_event_cap() -> usize {
    10_000
}

/// Runtime configuration.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | SIA_WORLD_MODEL_PATH | data/world_model.json | World Model document path |
/// | SIA_LOG_DIR | logs | Audit log directory (one `.jsonl` per category) |
/// | SIA_PROBLEM_SCORE_THRESHOLD | 0.5 | Minimum score for a gap to survive filtering |
/// | SIA_BASELINE_WINDOW_WEEKS | 3 | Baseline Calculator window (clamped to 2-4) |
/// | SIA_SNOOZE_DAYS | 7 | Default snooze duration |
/// | SIA_RATE_LIMIT_WINDOW_SECS | 60 | Rate limiter sliding window |
/// | SIA_RATE_LIMIT_MAX_REQUESTS | 100 | Max allowed requests per window |
/// | SIA_PROCESSED_EVENT_CAP | 10000 | Idempotency set eviction threshold |
/// | SIA_ANTHROPIC_API_KEY | unset | Presence wires an `LlmPort`; absence forces fallbacks |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiaConfig {
    #[serde(default = "default_world_model_path")]
    pub world_model_path: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_problem_score_threshold")]
    pub problem_score_threshold: f64,
    #[serde(default = "default_baseline_window_weeks")]
    pub baseline_window_weeks: u32,
    #[serde(default = "default_snooze_days")]
    pub snooze_days: i64,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,
    #[serde(default = "default_processed_event_cap")]
    pub processed_event_cap: usize,
    #[serde(default)]
    pub llm_enabled: bool,
}

impl Default for SiaConfig {
    fn default() -> Self {
        Self {
            world_model_path: default_world_model_path(),
            log_dir: default_log_dir(),
            problem_score_threshold: default_problem_score_threshold(),
            baseline_window_weeks: default_baseline_window_weeks(),
            snooze_days: default_snooze_days(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            processed_event_cap: default_processed_event_cap(),
            llm_enabled: false,
        }
    }
}

impl SiaConfig {
    /// Load configuration from the environment. Unset or invalid => defaults.
    pub fn from_env() -> Self {
        Self {
            world_model_path: env_string("SIA_WORLD_MODEL_PATH", default_world_model_path()),
            log_dir: env_string("SIA_LOG_DIR", default_log_dir()),
            problem_score_threshold: env_f64(
                "SIA_PROBLEM_SCORE_THRESHOLD",
                default_problem_score_threshold(),
            ),
            baseline_window_weeks: env_u32("SIA_BASELINE_WINDOW_WEEKS", default_baseline_window_weeks())
                .clamp(2, 4),
            snooze_days: env_i64("SIA_SNOOZE_DAYS", default_snooze_days()),
            rate_limit_window_secs: env_u64(
                "SIA_RATE_LIMIT_WINDOW_SECS",
                default_rate_limit_window_secs(),
            ),
            rate_limit_max_requests: env_u32(
                "SIA_RATE_LIMIT_MAX_REQUESTS",
                default_rate_limit_max_requests(),
            ),
            processed_event_cap: env_usize("SIA_PROCESSED_EVENT_CAP", default_processed_event_cap()),
            llm_enabled: std::env::var("SIA_ANTHROPIC_API_KEY")
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false),
        }
    }
}

fn env_string(name: &str, default: String) -> String {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty()).unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = SiaConfig::default();
        assert_eq!(config.problem_score_threshold, 0.5);
        assert_eq!(config.baseline_window_weeks, 3);
        assert_eq!(config.snooze_days, 7);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert_eq!(config.rate_limit_max_requests, 100);
        assert_eq!(config.processed_event_cap, 10_000);
        assert!(!config.llm_enabled);
    }
}
