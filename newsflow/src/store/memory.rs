//! In-memory run store.
//!
//! Reference implementation of the durability contract, and what the tests
//! run against. DashMap gives per-shard locking, which is what makes
//! `consume_token` and `transition` atomic per key.

use super::{RunStore, StoreError};
use crate::core::RunStatus;
use crate::run::Run;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

/// A shared in-memory run store.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: DashMap<Uuid, Run>,
    consumed: DashSet<String>,
}

impl InMemoryRunStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn save(&self, run: &Run) -> Result<(), StoreError> {
        match self.runs.entry(run.id) {
            dashmap::mapref::entry::Entry::Occupied(mut existing) => {
                let stored = existing.get();
                if stored.is_terminal() && stored.status != run.status {
                    return Err(StoreError::TerminalRun(run.id));
                }
                existing.insert(run.clone());
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(run.clone());
            }
        }
        Ok(())
    }

    async fn load(&self, run_id: Uuid) -> Result<Option<Run>, StoreError> {
        Ok(self.runs.get(&run_id).map(|r| r.value().clone()))
    }

    async fn consume_token(&self, token_id: &str) -> Result<bool, StoreError> {
        Ok(self.consumed.insert(token_id.to_string()))
    }

    async fn transition(
        &self,
        run_id: Uuid,
        from: RunStatus,
        to: RunStatus,
    ) -> Result<bool, StoreError> {
        let Some(mut run) = self.runs.get_mut(&run_id) else {
            return Ok(false);
        };
        if run.status != from || from.is_terminal() {
            return Ok(false);
        }
        run.status = to;
        run.touch();
        Ok(true)
    }
}
