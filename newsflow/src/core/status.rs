//! Run status, decision intent, and failure reason enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is actively executing stages.
    Running,
    /// The run is parked at the review gate awaiting a human decision.
    Suspended,
    /// The run finished the publish stage.
    Completed,
    /// The run hit a terminal failure.
    Failed,
    /// A reviewer rejected the run.
    Rejected,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Running
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Suspended => write!(f, "suspended"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl RunStatus {
    /// Returns true if the status is terminal. A terminal run is immutable.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Rejected)
    }
}

/// The decision a reviewer can hand back to a suspended run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionIntent {
    /// Continue into the publish stage.
    Approve,
    /// Terminate the run as rejected.
    Reject,
    /// Re-enter the drafting stage with feedback.
    Revise,
}

impl DecisionIntent {
    /// All intents a suspended run accepts, in notification order.
    pub const ALL: [Self; 3] = [Self::Approve, Self::Reject, Self::Revise];

    /// Stable wire name used inside resumption tokens.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Revise => "revise",
        }
    }
}

impl fmt::Display for DecisionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a run ended in [`RunStatus::Failed`].
///
/// Kept as a typed taxonomy so operators can tell "every source was down"
/// from "the model kept failing" from "the reviewer kept rejecting".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Every registered source adapter failed or timed out.
    NoSourcesAvailable,
    /// A stage exhausted its retry budget or hit a fatal backend error.
    Stage {
        /// Name of the failing stage.
        stage: String,
        /// Backend or parse error that ended the stage.
        reason: String,
    },
    /// The revision cycle limit was reached.
    RevisionLimitExceeded {
        /// The configured limit.
        limit: u32,
    },
    /// The run was administratively aborted.
    Aborted {
        /// Operator-supplied reason.
        reason: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSourcesAvailable => write!(f, "no sources available"),
            Self::Stage { stage, reason } => write!(f, "stage '{stage}' failed: {reason}"),
            Self::RevisionLimitExceeded { limit } => {
                write!(f, "revision limit exceeded ({limit})")
            }
            Self::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Running.to_string(), "running");
        assert_eq!(RunStatus::Suspended.to_string(), "suspended");
        assert_eq!(RunStatus::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_run_status_is_terminal() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Rejected.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Suspended.is_terminal());
    }

    #[test]
    fn test_run_status_serialize() {
        let json = serde_json::to_string(&RunStatus::Suspended).unwrap();
        assert_eq!(json, r#""suspended""#);

        let back: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RunStatus::Suspended);
    }

    #[test]
    fn test_decision_intent_wire_names() {
        assert_eq!(DecisionIntent::Approve.as_str(), "approve");
        assert_eq!(DecisionIntent::Reject.as_str(), "reject");
        assert_eq!(DecisionIntent::Revise.as_str(), "revise");
    }

    #[test]
    fn test_failure_reason_display() {
        let reason = FailureReason::Stage {
            stage: "draft".to_string(),
            reason: "backend unreachable".to_string(),
        };
        assert!(reason.to_string().contains("draft"));

        let reason = FailureReason::RevisionLimitExceeded { limit: 3 };
        assert!(reason.to_string().contains('3'));
    }

    #[test]
    fn test_failure_reason_tagged_serialization() {
        let reason = FailureReason::NoSourcesAvailable;
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "no_sources_available");
    }
}
