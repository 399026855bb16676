//! Topic classification stage.

use super::{excerpt, parse_json_array, StageFailure};
use crate::backend::{with_retries, GenerationBackend, GenerationRequest};
use crate::config::EngineConfig;
use crate::core::{Topic, TopicTag};
use crate::run::{stage_names, PipelineState};

const SYSTEM: &str = "You are a news analyst. For each numbered item, output a JSON array of \
objects with: index (int), topic (one of: llm, vision, robotics, policy, startup, research, \
industry, other), relevance (0.0-1.0). Output only valid JSON, no markdown fences.";

pub(crate) async fn run(
    state: &PipelineState,
    backend: &dyn GenerationBackend,
    config: &EngineConfig,
) -> Result<PipelineState, StageFailure> {
    let mut next = state.clone();
    let items = state.top_ranked(config.digest.max_items);
    if items.is_empty() {
        next.topics = Vec::new();
        return Ok(next);
    }

    let input = items
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{i}] {} — {}", s.item.title, excerpt(&s.item.body, 200)))
        .collect::<Vec<_>>()
        .join("\n");

    let request = GenerationRequest::new("classify", input).with_system(SYSTEM);
    let output = with_retries(&config.retry, stage_names::CLASSIFY, || {
        backend.generate(request.clone())
    })
    .await
    .map_err(|e| StageFailure::new(stage_names::CLASSIFY, e))?;

    let entries = parse_json_array(&output.content)
        .map_err(|e| StageFailure::new(stage_names::CLASSIFY, e))?;

    let mut tags = Vec::new();
    for entry in entries {
        let Some(index) = entry.get("index").and_then(serde_json::Value::as_u64) else {
            continue;
        };
        let Some(scored) = items.get(index as usize) else {
            continue; // out-of-range index from the backend, drop it
        };
        let topic = entry
            .get("topic")
            .and_then(serde_json::Value::as_str)
            .map_or(Topic::Other, Topic::parse_lenient);
        let relevance = entry
            .get("relevance")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.5)
            .clamp(0.0, 1.0);
        tags.push(TopicTag {
            canonical_id: scored.item.canonical_id.clone(),
            topic,
            relevance,
        });
    }

    tracing::info!(tagged = tags.len(), of = items.len(), "classification complete");
    next.topics = tags;
    Ok(next)
}
