//! Social draft stage.

use super::{excerpt, StageFailure};
use crate::backend::{with_retries, GenerationBackend, GenerationRequest};
use crate::config::EngineConfig;
use crate::core::DraftPost;
use crate::run::{stage_names, PipelineState};

const SYSTEM: &str = "You are a social content strategist. Write one post summarising the digest \
below. Open with a strong hook in the first 210 characters, use generous whitespace, 3-5 arrow \
bullets for takeaways, end with a question, then 3-5 hashtags. No filler openings. Output only \
the post text.";

pub(crate) async fn run(
    state: &PipelineState,
    backend: &dyn GenerationBackend,
    config: &EngineConfig,
) -> Result<PipelineState, StageFailure> {
    if state.summaries.is_empty() {
        return Err(StageFailure::new(
            stage_names::DRAFT,
            "no summaries to draft from",
        ));
    }

    let context = state
        .summaries
        .iter()
        .map(|s| format!("Headline: {}\nTopic: {}\nBody: {}", s.headline, s.topic, s.body))
        .collect::<Vec<_>>()
        .join("\n---\n");

    let mut system = SYSTEM.to_string();
    if let Some(feedback) = state.feedback.last() {
        system.push_str("\n\nReviewer feedback on the previous draft: ");
        system.push_str(feedback);
    }

    let request = GenerationRequest::new("draft", context)
        .with_system(system)
        .with_temperature(0.7);
    let output = with_retries(&config.retry, stage_names::DRAFT, || {
        backend.generate(request.clone())
    })
    .await
    .map_err(|e| StageFailure::new(stage_names::DRAFT, e))?;

    let body = excerpt(output.content.trim(), config.digest.max_draft_chars);
    if body.is_empty() {
        return Err(StageFailure::new(
            stage_names::DRAFT,
            "backend returned an empty draft",
        ));
    }

    let mut next = state.clone();
    next.draft = Some(DraftPost {
        body,
        revision: state.revisions,
    });
    tracing::info!(
        chars = next.draft.as_ref().map_or(0, DraftPost::len),
        revision = state.revisions,
        "draft complete"
    );
    Ok(next)
}
