//! The append-only pipeline state accumulator.

use crate::core::{
    AssetSpec, CandidateItem, Decision, DraftPost, Publication, ScoredItem, Summary, TopicTag,
};
use serde::{Deserialize, Serialize};

/// Accumulated state of one pipeline run.
///
/// Owned exclusively by its [`Run`](super::Run). Each stage reads the full
/// state and returns a superset: a stage overwrites only its own output
/// field (with an identical value given identical input), and never removes
/// anything another stage wrote. `feedback` and `failures` are append-only
/// and written by the engine, not by stages. This keeps replays and audits
/// safe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Merged fan-out output, unordered.
    #[serde(default)]
    pub raw_items: Vec<CandidateItem>,

    /// Deduplicated, scored, and ranked items.
    #[serde(default)]
    pub ranked: Vec<ScoredItem>,

    /// Classification stage output.
    #[serde(default)]
    pub topics: Vec<TopicTag>,

    /// Synthesis stage output.
    #[serde(default)]
    pub summaries: Vec<Summary>,

    /// Drafting stage output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftPost>,

    /// Asset-generation stage output.
    #[serde(default)]
    pub assets: Vec<AssetSpec>,

    /// Reviewer decision, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,

    /// Revision feedback, appended once per revise cycle.
    #[serde(default)]
    pub feedback: Vec<String>,

    /// Completed revise cycles.
    #[serde(default)]
    pub revisions: u32,

    /// Non-fatal failure log (per-adapter fan-out failures and the like).
    #[serde(default)]
    pub failures: Vec<String>,

    /// Publish stage record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<Publication>,
}

impl PipelineState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a non-fatal failure.
    pub fn record_failure(&mut self, entry: impl Into<String>) {
        self.failures.push(entry.into());
    }

    /// Appends reviewer feedback for the next drafting pass.
    pub fn push_feedback(&mut self, feedback: impl Into<String>) {
        self.feedback.push(feedback.into());
    }

    /// The ranked items capped for digest synthesis.
    #[must_use]
    pub fn top_ranked(&self, max_items: usize) -> &[ScoredItem] {
        &self.ranked[..self.ranked.len().min(max_items)]
    }
}
