//! The run store: durable keyed storage for runs and consumed tokens.
//!
//! The store is the single source of truth across process restarts and the
//! only shared mutable resource between runs. Implementations must make
//! `consume_token` and `transition` atomic per key — they are the two
//! operations the resumption race hangs on.

mod memory;

pub use memory::InMemoryRunStore;

use crate::core::RunStatus;
use crate::run::Run;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Store operation failure.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// An attempt was made to mutate a terminal run.
    #[error("run {0} is terminal and immutable")]
    TerminalRun(Uuid),
    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Durable keyed storage for pipeline runs.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persists a run snapshot, overwriting any previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TerminalRun`] when the stored run is already
    /// terminal and the snapshot would change it.
    async fn save(&self, run: &Run) -> Result<(), StoreError>;

    /// Loads a run snapshot.
    async fn load(&self, run_id: Uuid) -> Result<Option<Run>, StoreError>;

    /// Atomically checks and marks a token consumed.
    ///
    /// Returns `true` exactly once per token id; every later call returns
    /// `false`. The check and the mark are a single operation so two
    /// concurrent resumptions cannot both win.
    async fn consume_token(&self, token_id: &str) -> Result<bool, StoreError>;

    /// Conditionally transitions a run's status.
    ///
    /// Returns `true` only when the stored status equals `from` and was
    /// swapped to `to` in the same operation. Transitions out of a terminal
    /// status never succeed.
    async fn transition(
        &self,
        run_id: Uuid,
        from: RunStatus,
        to: RunStatus,
    ) -> Result<bool, StoreError>;
}
