//! The notification seam: how a suspended run reaches its human reviewer.

use crate::core::DecisionIntent;
use crate::gate::ResumptionToken;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Human-readable preview of a suspended run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPreview {
    /// The suspended run.
    pub run_id: Uuid,
    /// Opening of the draft, capped for display.
    pub draft_excerpt: String,
    /// How many digest entries the run produced.
    pub summary_count: usize,
    /// How many asset cards the run produced.
    pub asset_count: usize,
    /// Actions a reviewer can take.
    pub pending: Vec<DecisionIntent>,
    /// When the minted tokens lapse.
    pub expires_at: DateTime<Utc>,
}

/// A preview plus the signed tokens that act on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// The preview.
    pub preview: ReviewPreview,
    /// Token resuming the run with approve.
    pub approve: ResumptionToken,
    /// Token resuming the run with reject.
    pub reject: ResumptionToken,
    /// Token resuming the run with revise.
    pub revise: ResumptionToken,
}

/// Notification delivery failure.
#[derive(Debug, Clone, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers review requests to humans.
///
/// Delivery failure must never destroy the suspended run: the run stays
/// parked and resumable by any channel that can produce a valid token.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one review request.
    async fn notify(&self, request: &ReviewRequest) -> Result<(), NotifyError>;
}

/// A notifier that only logs. Useful default for development.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, request: &ReviewRequest) -> Result<(), NotifyError> {
        tracing::info!(
            run_id = %request.preview.run_id,
            summaries = request.preview.summary_count,
            assets = request.preview.asset_count,
            expires_at = %request.preview.expires_at,
            "review requested"
        );
        Ok(())
    }
}
