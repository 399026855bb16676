//! Publish stage.
//!
//! Records the handoff to the delivery channels; actual email/social
//! transport is an external concern.

use super::StageFailure;
use crate::core::Publication;
use crate::run::{stage_names, PipelineState};
use chrono::Utc;

pub(crate) fn run(state: &PipelineState) -> Result<PipelineState, StageFailure> {
    if state.draft.is_none() {
        return Err(StageFailure::new(
            stage_names::PUBLISH,
            "no approved draft to publish",
        ));
    }

    let mut next = state.clone();
    next.published = Some(Publication {
        channels: vec!["email".to_string(), "social".to_string()],
        published_at: Utc::now(),
    });
    tracing::info!("publish recorded");
    Ok(next)
}
