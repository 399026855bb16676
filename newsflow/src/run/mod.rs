//! Run records: one [`Run`] per end-to-end pipeline execution.

mod state;

pub use state::PipelineState;

use crate::core::{FailureReason, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage names as recorded on the run, in pipeline order.
pub mod stage_names {
    /// Concurrent source collection.
    pub const FAN_OUT: &str = "fan_out";
    /// Deduplication and scoring.
    pub const DEDUP: &str = "dedup";
    /// Topic classification.
    pub const CLASSIFY: &str = "classify";
    /// Digest synthesis.
    pub const SYNTHESIZE: &str = "synthesize";
    /// Social draft generation.
    pub const DRAFT: &str = "draft";
    /// Asset descriptor generation.
    pub const RENDER_ASSETS: &str = "render_assets";
    /// Parked at the review gate.
    pub const AWAIT_REVIEW: &str = "await_review";
    /// Publish handoff.
    pub const PUBLISH: &str = "publish";
}

/// One execution of the pipeline.
///
/// The run is the unit of persistence: everything needed to resume after a
/// full process restart lives on this record, nothing lives only in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Unique run identifier.
    pub id: Uuid,
    /// Name of the stage the run is in (or stopped in).
    pub stage: String,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Why the run failed, when status is [`RunStatus::Failed`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Accumulated pipeline state.
    pub state: PipelineState,
}

impl Run {
    /// Creates a fresh run in [`RunStatus::Running`].
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            stage: stage_names::FAN_OUT.to_string(),
            status: RunStatus::Running,
            failure: None,
            created_at: now,
            updated_at: now,
            state: PipelineState::new(),
        }
    }

    /// Moves the run to a new stage.
    pub fn enter_stage(&mut self, stage: &str) {
        self.stage = stage.to_string();
        self.touch();
    }

    /// Marks the run terminally failed, retaining the stage it failed in.
    pub fn fail(&mut self, reason: FailureReason) {
        self.status = RunStatus::Failed;
        self.failure = Some(reason);
        self.touch();
    }

    /// Refreshes the last-updated timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True if the run can no longer be mutated.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl Default for Run {
    fn default() -> Self {
        Self::new()
    }
}
