//! Credibility scoring: source reputation, corroboration bonus, recency
//! decay.

use crate::config::DedupConfig;
use crate::core::{CandidateItem, SourceClass};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Source reputation lookup table.
///
/// Keys are source identifiers (`"arxiv"`, `"rss:techcrunch"`). Lookup falls
/// back from the exact identifier to its prefix before `:`, then to the
/// source class base, then to the configured floor, so an unknown source
/// never fails a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationTable {
    /// Per-source scores in `[0, 1]`.
    #[serde(default)]
    scores: HashMap<String, f64>,
    /// Floor used for fully unknown sources.
    #[serde(default = "default_floor")]
    default_reputation: f64,
}

fn default_floor() -> f64 {
    0.4
}

impl Default for ReputationTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReputationTable {
    /// Creates an empty table with the given floor.
    #[must_use]
    pub fn new(default_reputation: f64) -> Self {
        Self {
            scores: HashMap::new(),
            default_reputation,
        }
    }

    /// The built-in table seeded with the sources the digest ships with.
    #[must_use]
    pub fn builtin() -> Self {
        let mut scores = HashMap::new();
        for (source, score) in [
            // Wire services and major newsrooms
            ("wire:reuters", 0.95),
            ("wire:bbc", 0.92),
            // Established tech journalism
            ("rss:techcrunch", 0.85),
            ("rss:theverge", 0.82),
            ("rss:venturebeat", 0.80),
            ("rss:mit-tech-review", 0.90),
            ("rss", 0.72),
            // Research venues
            ("arxiv", 0.80),
            ("openreview", 0.82),
            // Search and aggregators
            ("search", 0.55),
            ("tavily", 0.60),
        ] {
            scores.insert(source.to_string(), score);
        }
        Self {
            scores,
            default_reputation: default_floor(),
        }
    }

    /// Adds or overrides one source score.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>, score: f64) -> Self {
        self.scores.insert(source.into(), score);
        self
    }

    /// Looks up the reputation for a source identifier.
    #[must_use]
    pub fn lookup(&self, source: &str, class: SourceClass) -> f64 {
        if let Some(score) = self.scores.get(source) {
            return *score;
        }
        // "rss:techcrunch" falls back to the "rss" family entry.
        if let Some((prefix, _)) = source.split_once(':') {
            if let Some(score) = self.scores.get(prefix) {
                return *score;
            }
        }
        match class {
            SourceClass::Wire => 0.90,
            SourceClass::Established => 0.82,
            SourceClass::Research => 0.80,
            SourceClass::Blog => 0.50,
            SourceClass::Unknown => self.default_reputation,
        }
    }
}

/// Scores one duplicate group.
///
/// The reputation term takes the best reputation among the group's members,
/// so extra corroboration can never lower a story's score. The
/// corroboration bonus `1 - 1/(1+N)` grows with diminishing returns in the
/// number of distinct sources. Recency decays exponentially with the
/// configured half-life and never goes below zero.
#[must_use]
pub fn score_group(
    members: &[&CandidateItem],
    representative: &CandidateItem,
    distinct_sources: usize,
    config: &DedupConfig,
    now: DateTime<Utc>,
) -> f64 {
    let reputation = members
        .iter()
        .map(|m| config.reputation.lookup(&m.source, m.class))
        .fold(0.0_f64, f64::max);

    let corroboration = 1.0 - 1.0 / (1.0 + distinct_sources as f64);

    let base =
        config.reputation_weight * reputation + config.corroboration_weight * corroboration;

    let age_days = (now - representative.published_at)
        .num_seconds()
        .max(0) as f64
        / 86_400.0;
    let decay = (-age_days * std::f64::consts::LN_2 / config.recency_half_life_days).exp();

    (base * decay).clamp(0.0, 1.0)
}
