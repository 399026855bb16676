//! Digest synthesis stage.

use super::{excerpt, parse_json_array, StageFailure};
use crate::backend::{with_retries, GenerationBackend, GenerationRequest};
use crate::config::EngineConfig;
use crate::core::{Summary, Topic};
use crate::run::{stage_names, PipelineState};

const SYSTEM: &str = "You are a senior technology journalist writing a digest. For each story, \
write a headline (max 80 chars) and a 2-3 sentence body with the key insight and any numbers or \
dates. Output a JSON array of objects: {headline, body, topic, source_url, credibility}. Rank by \
importance, biggest story first. Output only valid JSON, no markdown fences.";

pub(crate) async fn run(
    state: &PipelineState,
    backend: &dyn GenerationBackend,
    config: &EngineConfig,
) -> Result<PipelineState, StageFailure> {
    let mut next = state.clone();
    let items = state.top_ranked(config.digest.max_items);
    if items.is_empty() {
        next.summaries = Vec::new();
        return Ok(next);
    }

    let context = items
        .iter()
        .map(|s| {
            format!(
                "Title: {}\nSources: {}\nURL: {}\nCredibility: {:.2}\nContent: {}",
                s.item.title,
                s.sources.iter().cloned().collect::<Vec<_>>().join(", "),
                s.item.url,
                s.score,
                excerpt(&s.item.body, 500),
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n");

    let mut system = SYSTEM.to_string();
    if let Some(feedback) = state.feedback.last() {
        system.push_str("\n\nReviewer feedback on the previous draft: ");
        system.push_str(feedback);
    }

    let request = GenerationRequest::new("synthesize", context)
        .with_system(system)
        .with_temperature(0.3);
    let output = with_retries(&config.retry, stage_names::SYNTHESIZE, || {
        backend.generate(request.clone())
    })
    .await
    .map_err(|e| StageFailure::new(stage_names::SYNTHESIZE, e))?;

    let entries = parse_json_array(&output.content)
        .map_err(|e| StageFailure::new(stage_names::SYNTHESIZE, e))?;

    let summaries: Vec<Summary> = entries
        .iter()
        .filter_map(|entry| {
            let headline = entry.get("headline")?.as_str()?.to_string();
            let body = entry
                .get("body")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string();
            let topic = entry
                .get("topic")
                .and_then(serde_json::Value::as_str)
                .map_or(Topic::Industry, Topic::parse_lenient);
            let source_urls = entry
                .get("source_url")
                .and_then(serde_json::Value::as_str)
                .map(|u| vec![u.to_string()])
                .unwrap_or_default();
            let credibility = entry
                .get("credibility")
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.5);
            Some(Summary {
                headline,
                body,
                topic,
                source_urls,
                credibility,
            })
        })
        .collect();

    if summaries.is_empty() {
        return Err(StageFailure::new(
            stage_names::SYNTHESIZE,
            "backend returned no usable summaries",
        ));
    }

    tracing::info!(count = summaries.len(), "synthesis complete");
    next.summaries = summaries;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scored, ScriptedBackend};

    fn state_with_items() -> PipelineState {
        let mut state = PipelineState::new();
        state.ranked = vec![
            scored("Story A", "https://example.com/a", 0.9),
            scored("Story B", "https://example.com/b", 0.5),
        ];
        state
    }

    #[tokio::test]
    async fn test_synthesize_parses_summaries() {
        let backend = ScriptedBackend::new().respond(
            "synthesize",
            r#"[{"headline": "Big story", "body": "It happened.", "topic": "llm",
                "source_url": "https://example.com/a", "credibility": 0.9}]"#,
        );

        let next = run(&state_with_items(), &backend, &EngineConfig::default())
            .await
            .unwrap();
        assert_eq!(next.summaries.len(), 1);
        assert_eq!(next.summaries[0].headline, "Big story");
        assert_eq!(next.summaries[0].topic, Topic::Llm);
    }

    #[tokio::test]
    async fn test_synthesize_includes_latest_feedback() {
        let backend = ScriptedBackend::new()
            .respond("synthesize", r#"[{"headline": "h", "body": "b"}]"#);
        let mut state = state_with_items();
        state.push_feedback("tone it down");

        run(&state, &backend, &EngineConfig::default()).await.unwrap();
        let request = backend.last_request().unwrap();
        assert!(request.system.contains("tone it down"));
    }

    #[tokio::test]
    async fn test_synthesize_no_usable_summaries_fails() {
        let backend = ScriptedBackend::new().respond("synthesize", "[]");
        let result = run(&state_with_items(), &backend, &EngineConfig::default()).await;
        assert_eq!(result.unwrap_err().stage, "synthesize");
    }

    #[tokio::test]
    async fn test_synthesize_replay_is_idempotent() {
        let backend = ScriptedBackend::new()
            .respond("synthesize", r#"[{"headline": "h", "body": "b"}]"#);
        let state = state_with_items();
        let config = EngineConfig::default();

        let once = run(&state, &backend, &config).await.unwrap();
        let twice = run(&once, &backend, &config).await.unwrap();
        assert_eq!(once.summaries, twice.summaries);
    }
}
