//! The resumption verifier: turns an inbound token into an admitted run.
//!
//! Admission is the security boundary. Signature and expiry come first,
//! then single-use consumption, then the conditional status flip that
//! guarantees at most one resumption ever proceeds per run — even when two
//! still-valid tokens for different actions race.

use crate::core::RunStatus;
use crate::errors::NewsflowError;
use crate::gate::{TokenClaims, TokenError, TokenSigner};
use crate::run::Run;
use crate::store::RunStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of a resumption attempt. Each variant is a distinct, stable
/// outward signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResumeOutcome {
    /// The run was admitted and routed; `status` is where it ended up.
    Resumed {
        /// The resumed run.
        run_id: Uuid,
        /// Status after post-gate routing.
        status: RunStatus,
    },
    /// Malformed token or signature mismatch.
    InvalidToken,
    /// The token's validity window has passed.
    ExpiredToken,
    /// The token was already consumed.
    AlreadyUsed,
    /// No run exists for the token's run id.
    RunNotFound,
    /// The run is not suspended (already resumed, terminal, or racing).
    NotSuspended,
}

/// Result of token admission: either the run, exclusively owned by this
/// resumption, or the denial to report.
#[derive(Debug)]
pub enum Admission {
    /// Admission granted; the run's status has been flipped to running.
    Granted {
        /// The loaded run.
        run: Run,
        /// The verified claims.
        claims: TokenClaims,
    },
    /// Admission denied.
    Denied(ResumeOutcome),
}

/// Validates inbound tokens and claims exclusive ownership of the bound
/// run.
pub struct ResumptionVerifier {
    store: Arc<dyn RunStore>,
    signer: TokenSigner,
}

impl ResumptionVerifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new(store: Arc<dyn RunStore>, signer: TokenSigner) -> Self {
        Self { store, signer }
    }

    /// Admits a token against the current clock.
    ///
    /// # Errors
    ///
    /// Only store faults escape as errors; every protocol-level rejection
    /// is a [`Admission::Denied`] value.
    pub async fn admit(&self, token: &str) -> Result<Admission, NewsflowError> {
        self.admit_at(token, Utc::now()).await
    }

    /// Admits a token with an explicit clock.
    pub async fn admit_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Admission, NewsflowError> {
        let claims = match self.signer.verify_at(token, now) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                tracing::info!("resumption rejected: token expired");
                return Ok(Admission::Denied(ResumeOutcome::ExpiredToken));
            }
            Err(error) => {
                tracing::warn!(error = %error, "resumption rejected: invalid token");
                return Ok(Admission::Denied(ResumeOutcome::InvalidToken));
            }
        };

        // Single compare-and-set: consumption and its check are one
        // operation, so a replayed token loses here no matter how valid
        // its signature still is.
        if !self.store.consume_token(&claims.token_id).await? {
            tracing::warn!(run_id = %claims.run_id, "resumption rejected: token already used");
            return Ok(Admission::Denied(ResumeOutcome::AlreadyUsed));
        }

        let Some(mut run) = self.store.load(claims.run_id).await? else {
            return Ok(Admission::Denied(ResumeOutcome::RunNotFound));
        };

        if !self
            .store
            .transition(run.id, RunStatus::Suspended, RunStatus::Running)
            .await?
        {
            tracing::info!(run_id = %run.id, status = %run.status, "resumption rejected: run not suspended");
            return Ok(Admission::Denied(ResumeOutcome::NotSuspended));
        }
        run.status = RunStatus::Running;

        tracing::info!(run_id = %run.id, action = %claims.action, "resumption admitted");
        Ok(Admission::Granted { run, claims })
    }
}
