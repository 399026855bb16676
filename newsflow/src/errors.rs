//! Error taxonomy for the newsflow engine.
//!
//! Transient adapter and backend errors are retried and absorbed close to
//! where they happen; everything in this enum is either a terminal run
//! condition or a fault the caller must see. The engine itself converts
//! terminal conditions into run status, never into an escaping panic.

use crate::core::RunStatus;
use crate::gate::TokenError;
use crate::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// The main error type for newsflow operations.
#[derive(Debug, Error)]
pub enum NewsflowError {
    /// Every registered source adapter failed or timed out.
    #[error("no sources available: all adapters failed")]
    NoSourcesAvailable,

    /// A stage exhausted its retries or hit a fatal backend error.
    #[error("stage '{stage}' failed: {reason}")]
    Stage {
        /// Name of the failing stage.
        stage: String,
        /// What ended it.
        reason: String,
    },

    /// A resumption token failed verification.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The run bound to a token does not exist.
    #[error("run not found: {0}")]
    RunNotFound(Uuid),

    /// Resumption was attempted against a run that is not suspended.
    #[error("run {run_id} is not suspended (status: {status})")]
    RunNotSuspended {
        /// The run in question.
        run_id: Uuid,
        /// Its actual status.
        status: RunStatus,
    },

    /// The revise loop hit its configured bound.
    #[error("revision limit exceeded ({limit})")]
    RevisionLimitExceeded {
        /// The configured limit.
        limit: u32,
    },

    /// A run store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// State snapshot (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display() {
        let err = NewsflowError::Stage {
            stage: "synthesize".to_string(),
            reason: "retries exhausted".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "stage 'synthesize' failed: retries exhausted"
        );
    }

    #[test]
    fn test_not_suspended_display() {
        let err = NewsflowError::RunNotSuspended {
            run_id: Uuid::nil(),
            status: RunStatus::Completed,
        };
        assert!(err.to_string().contains("completed"));
    }
}
