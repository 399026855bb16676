//! Engine configuration.
//!
//! Scoring thresholds, decay curves, retry budgets, and token lifetimes are
//! deployment policy, not structural invariants, so everything here is a
//! tunable with a serde-friendly shape and sensible defaults.

use crate::backend::RetryPolicy;
use crate::dedup::ReputationTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the fan-out coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutConfig {
    /// Shared collection window for all adapters, in seconds.
    #[serde(default = "default_window")]
    pub window_seconds: f64,
}

fn default_window() -> f64 {
    20.0
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window(),
        }
    }
}

impl FanOutConfig {
    /// The collection window as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs_f64(self.window_seconds)
    }
}

/// Configuration for deduplication and credibility scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Normalized-title similarity above which two items with equal
    /// canonical ids are the same story.
    #[serde(default = "default_similarity")]
    pub similarity_threshold: f64,
    /// Half-life of the recency decay, in days.
    #[serde(default = "default_half_life")]
    pub recency_half_life_days: f64,
    /// Weight of the source reputation term.
    #[serde(default = "default_reputation_weight")]
    pub reputation_weight: f64,
    /// Weight of the corroboration bonus term.
    #[serde(default = "default_corroboration_weight")]
    pub corroboration_weight: f64,
    /// Reputation table used for the base score.
    #[serde(default)]
    pub reputation: ReputationTable,
}

fn default_similarity() -> f64 {
    0.82
}

fn default_half_life() -> f64 {
    3.0
}

fn default_reputation_weight() -> f64 {
    0.6
}

fn default_corroboration_weight() -> f64 {
    0.4
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity(),
            recency_half_life_days: default_half_life(),
            reputation_weight: default_reputation_weight(),
            corroboration_weight: default_corroboration_weight(),
            reputation: ReputationTable::default(),
        }
    }
}

/// Configuration for the suspension gate and resumption tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Token validity window in hours.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
    /// Maximum revise cycles before the run fails.
    #[serde(default = "default_max_revisions")]
    pub max_revisions: u32,
}

fn default_token_ttl() -> i64 {
    72
}

fn default_max_revisions() -> u32 {
    3
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: default_token_ttl(),
            max_revisions: default_max_revisions(),
        }
    }
}

/// Configuration for digest content shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Maximum ranked items fed into synthesis.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Hard character cap on the social draft.
    #[serde(default = "default_max_draft_chars")]
    pub max_draft_chars: usize,
}

fn default_max_items() -> usize {
    10
}

fn default_max_draft_chars() -> usize {
    3000
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            max_draft_chars: default_max_draft_chars(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fan-out coordinator settings.
    #[serde(default)]
    pub fanout: FanOutConfig,
    /// Dedup and scoring settings.
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Generation backend retry policy.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Suspension gate settings.
    #[serde(default)]
    pub gate: GateConfig,
    /// Digest shaping settings.
    #[serde(default)]
    pub digest: DigestConfig,
}

impl EngineConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fan-out collection window.
    #[must_use]
    pub fn with_fanout_window(mut self, window: Duration) -> Self {
        self.fanout.window_seconds = window.as_secs_f64();
        self
    }

    /// Sets the title similarity threshold.
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.dedup.similarity_threshold = threshold;
        self
    }

    /// Sets the token validity window.
    #[must_use]
    pub fn with_token_ttl_hours(mut self, hours: i64) -> Self {
        self.gate.token_ttl_hours = hours;
        self
    }

    /// Sets the revision cycle bound.
    #[must_use]
    pub fn with_max_revisions(mut self, limit: u32) -> Self {
        self.gate.max_revisions = limit;
        self
    }

    /// Sets the backend retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.gate.token_ttl_hours, 72);
        assert_eq!(config.gate.max_revisions, 3);
        assert!(config.dedup.similarity_threshold > 0.5);
        assert_eq!(config.digest.max_draft_chars, 3000);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_token_ttl_hours(48)
            .with_max_revisions(1)
            .with_similarity_threshold(0.9);
        assert_eq!(config.gate.token_ttl_hours, 48);
        assert_eq!(config.gate.max_revisions, 1);
        assert!((config.dedup.similarity_threshold - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"gate": {"token_ttl_hours": 24}}"#).unwrap();
        assert_eq!(config.gate.token_ttl_hours, 24);
        assert_eq!(config.gate.max_revisions, 3);
        assert_eq!(config.digest.max_items, 10);
    }
}
