//! The suspension gate: where a run durably parks awaiting human review.
//!
//! Parking holds no thread, lock, or connection. The persisted run record
//! is the only live state, so the wait can span hours or days and survive
//! full process restarts at zero resource cost.

mod token;

pub use token::{ResumptionToken, TokenClaims, TokenError, TokenSigner};

use crate::config::GateConfig;
use crate::core::{DecisionIntent, RunStatus};
use crate::errors::NewsflowError;
use crate::notify::{Notifier, ReviewPreview, ReviewRequest};
use crate::run::{stage_names, Run};
use crate::store::RunStore;
use chrono::Duration;
use std::sync::Arc;

/// Display cap on the draft excerpt in previews.
const EXCERPT_CHARS: usize = 280;

/// Persists the suspension snapshot, mints the decision tokens, and hands
/// the review request to the notifier.
pub struct SuspensionGate {
    store: Arc<dyn RunStore>,
    notifier: Arc<dyn Notifier>,
    signer: TokenSigner,
    config: GateConfig,
}

impl SuspensionGate {
    /// Creates a gate.
    #[must_use]
    pub fn new(
        store: Arc<dyn RunStore>,
        notifier: Arc<dyn Notifier>,
        signer: TokenSigner,
        config: GateConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            signer,
            config,
        }
    }

    /// Parks a run at the gate.
    ///
    /// The snapshot is persisted with status [`RunStatus::Suspended`]
    /// before any token leaves this process, so a crash after the
    /// notification still leaves a resumable run. Notification failure is
    /// logged and swallowed for the same reason.
    pub async fn park(&self, run: &mut Run) -> Result<ReviewRequest, NewsflowError> {
        run.status = RunStatus::Suspended;
        run.enter_stage(stage_names::AWAIT_REVIEW);
        self.store.save(run).await?;

        let request = self.review_request(run)?;
        if let Err(error) = self.notifier.notify(&request).await {
            tracing::warn!(run_id = %run.id, error = %error, "review notification failed; run stays parked");
        } else {
            tracing::info!(run_id = %run.id, "run suspended awaiting review");
        }
        Ok(request)
    }

    /// Mints fresh tokens and rebuilds the review request for an
    /// already-suspended run (administrative resend).
    pub fn review_request(&self, run: &Run) -> Result<ReviewRequest, NewsflowError> {
        let ttl = Duration::hours(self.config.token_ttl_hours);
        let approve = self.signer.mint(run.id, DecisionIntent::Approve, ttl)?;
        let reject = self.signer.mint(run.id, DecisionIntent::Reject, ttl)?;
        let revise = self.signer.mint(run.id, DecisionIntent::Revise, ttl)?;

        let mut preview = self.preview(run);
        preview.expires_at = approve.claims.expires_at;

        Ok(ReviewRequest {
            preview,
            approve,
            reject,
            revise,
        })
    }

    /// Builds the human-readable preview of a run, without tokens.
    ///
    /// Reconstructable at any time from the stored snapshot alone; the
    /// expiry shown is when tokens minted at suspension time lapse.
    #[must_use]
    pub fn preview(&self, run: &Run) -> ReviewPreview {
        let draft_excerpt = run
            .state
            .draft
            .as_ref()
            .map(|d| d.body.chars().take(EXCERPT_CHARS).collect())
            .unwrap_or_default();
        ReviewPreview {
            run_id: run.id,
            draft_excerpt,
            summary_count: run.state.summaries.len(),
            asset_count: run.state.assets.len(),
            pending: DecisionIntent::ALL.to_vec(),
            expires_at: run.updated_at + Duration::hours(self.config.token_ttl_hours),
        }
    }
}
