//! Asset descriptor stage.
//!
//! Decides what goes on each story card; rendering is an external concern.

use super::StageFailure;
use crate::core::AssetSpec;
use crate::run::PipelineState;

/// Card geometry for the default social template.
const CARD_WIDTH: u32 = 1200;
const CARD_HEIGHT: u32 = 627;
const TEMPLATE: &str = "news_card";

/// Cards are only produced for the leading stories.
const MAX_CARDS: usize = 3;

pub(crate) fn run(state: &PipelineState) -> Result<PipelineState, StageFailure> {
    let mut next = state.clone();
    next.assets = state
        .summaries
        .iter()
        .take(MAX_CARDS)
        .map(|summary| AssetSpec {
            headline: summary.headline.clone(),
            topic: summary.topic,
            width: CARD_WIDTH,
            height: CARD_HEIGHT,
            template: TEMPLATE.to_string(),
        })
        .collect();
    tracing::debug!(count = next.assets.len(), "asset descriptors derived");
    Ok(next)
}
