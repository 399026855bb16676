//! The ordered transformation stages.
//!
//! Stages form a fixed, statically enumerable list rather than a runtime
//! graph: [`PipelineStage`] is a tagged union and routing after the review
//! gate picks one of three hard-coded paths. Each stage is a pure function
//! of the accumulated state apart from its own backend call, and replaying
//! a stage on identical input (with a deterministic backend) produces an
//! identical state.

mod assets;
mod classify;
mod draft;
mod publish;
mod synthesize;

use crate::backend::GenerationBackend;
use crate::config::EngineConfig;
use crate::core::DecisionIntent;
use crate::run::{stage_names, PipelineState};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// A stage's fatal failure, carrying the stage name for the run record.
#[derive(Debug, Clone, Error)]
#[error("stage '{stage}' failed: {reason}")]
pub struct StageFailure {
    /// Name of the failing stage.
    pub stage: &'static str,
    /// What ended it.
    pub reason: String,
}

impl StageFailure {
    /// Creates a stage failure.
    #[must_use]
    pub fn new(stage: &'static str, reason: impl std::fmt::Display) -> Self {
        Self {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// One transformation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Tag ranked items with topics and relevance.
    Classify,
    /// Synthesize digest summaries.
    Synthesize,
    /// Generate the social draft.
    Draft,
    /// Derive asset descriptors.
    RenderAssets,
    /// Record the publish handoff.
    Publish,
}

impl PipelineStage {
    /// Stages executed before the review gate, in order.
    pub const PRE_GATE: [Self; 4] = [Self::Classify, Self::Synthesize, Self::Draft, Self::RenderAssets];

    /// Stages re-executed on a revise decision, in order.
    pub const REVISE: [Self; 2] = [Self::Draft, Self::RenderAssets];

    /// Stages executed on an approve decision.
    pub const APPROVE: [Self; 1] = [Self::Publish];

    /// Post-gate continuation for a decision. Reject has no stages: the run
    /// goes terminal directly.
    #[must_use]
    pub fn route(intent: DecisionIntent) -> &'static [Self] {
        match intent {
            DecisionIntent::Approve => &Self::APPROVE,
            DecisionIntent::Reject => &[],
            DecisionIntent::Revise => &Self::REVISE,
        }
    }

    /// The stage name as recorded on the run.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classify => stage_names::CLASSIFY,
            Self::Synthesize => stage_names::SYNTHESIZE,
            Self::Draft => stage_names::DRAFT,
            Self::RenderAssets => stage_names::RENDER_ASSETS,
            Self::Publish => stage_names::PUBLISH,
        }
    }

    /// Applies the stage to the accumulated state, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns [`StageFailure`] when the stage's backend call fails fatally
    /// or its output cannot be interpreted.
    pub async fn apply(
        &self,
        state: &PipelineState,
        backend: &dyn GenerationBackend,
        config: &EngineConfig,
    ) -> Result<PipelineState, StageFailure> {
        match self {
            Self::Classify => classify::run(state, backend, config).await,
            Self::Synthesize => synthesize::run(state, backend, config).await,
            Self::Draft => draft::run(state, backend, config).await,
            Self::RenderAssets => assets::run(state),
            Self::Publish => publish::run(state),
        }
    }
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^```(?:json)?\s*|\s*```$").expect("static pattern"))
}

/// Strips markdown fences the backend sometimes wraps JSON in, then parses
/// the content as a JSON array.
pub(crate) fn parse_json_array(content: &str) -> Result<Vec<serde_json::Value>, String> {
    let stripped = fence_pattern().replace_all(content.trim(), "");
    let value: serde_json::Value =
        serde_json::from_str(stripped.trim()).map_err(|e| format!("unparseable output: {e}"))?;
    match value {
        serde_json::Value::Array(entries) => Ok(entries),
        other => Err(format!("expected a JSON array, got {other}")),
    }
}

/// First `max_chars` characters of a string, on a char boundary.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_by_intent() {
        assert_eq!(
            PipelineStage::route(DecisionIntent::Approve).to_vec(),
            vec![PipelineStage::Publish]
        );
        assert!(PipelineStage::route(DecisionIntent::Reject).is_empty());
        assert_eq!(
            PipelineStage::route(DecisionIntent::Revise).to_vec(),
            vec![PipelineStage::Draft, PipelineStage::RenderAssets]
        );
    }

    #[test]
    fn test_pre_gate_order() {
        let names: Vec<_> = PipelineStage::PRE_GATE.iter().map(PipelineStage::name).collect();
        assert_eq!(names, vec!["classify", "synthesize", "draft", "render_assets"]);
    }

    #[test]
    fn test_parse_json_array_strips_fences() {
        let fenced = "```json\n[{\"index\": 0}]\n```";
        let entries = parse_json_array(fenced).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_parse_json_array_rejects_non_array() {
        assert!(parse_json_array("{\"a\": 1}").is_err());
        assert!(parse_json_array("not json").is_err());
    }

    #[test]
    fn test_excerpt_char_boundary() {
        assert_eq!(excerpt("héllo wörld", 5), "héllo");
        assert_eq!(excerpt("ab", 5), "ab");
    }
}
