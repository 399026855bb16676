//! The orchestration engine.
//!
//! One engine serves any number of concurrent, fully independent runs. No
//! execution context survives a suspension: the continuation after the
//! review gate is reconstructed purely from the persisted snapshot plus the
//! verified decision intent, which is what lets the process die and restart
//! between suspension and resumption.

#[cfg(test)]
mod integration_tests;

use crate::backend::GenerationBackend;
use crate::config::EngineConfig;
use crate::core::{Decision, DecisionIntent, FailureReason, RunStatus};
use crate::dedup;
use crate::errors::NewsflowError;
use crate::gate::{SuspensionGate, TokenSigner};
use crate::notify::{Notifier, ReviewPreview, ReviewRequest};
use crate::resume::{Admission, ResumeOutcome, ResumptionVerifier};
use crate::run::{stage_names, Run};
use crate::sources::{FanOutCoordinator, SourceAdapter};
use crate::stages::PipelineStage;
use crate::store::RunStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// The pipeline orchestrator.
pub struct Engine {
    store: Arc<dyn RunStore>,
    backend: Arc<dyn GenerationBackend>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    config: EngineConfig,
    gate: SuspensionGate,
    verifier: ResumptionVerifier,
}

impl Engine {
    /// Creates an engine over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn RunStore>,
        notifier: Arc<dyn Notifier>,
        backend: Arc<dyn GenerationBackend>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        signer: TokenSigner,
        config: EngineConfig,
    ) -> Self {
        let gate = SuspensionGate::new(
            Arc::clone(&store),
            notifier,
            signer.clone(),
            config.gate.clone(),
        );
        let verifier = ResumptionVerifier::new(Arc::clone(&store), signer);
        Self {
            store,
            backend,
            adapters,
            config,
            gate,
            verifier,
        }
    }

    /// Starts a new run and drives it to the review gate (or a terminal
    /// failure).
    ///
    /// Terminal conditions become run status, not errors: the returned run
    /// is either [`RunStatus::Suspended`] or [`RunStatus::Failed`]. Only
    /// store faults escape as `Err`.
    pub async fn start(&self) -> Result<Run, NewsflowError> {
        let mut run = Run::new();
        tracing::info!(run_id = %run.id, adapters = self.adapters.len(), "run started");
        self.store.save(&run).await?;

        let coordinator =
            FanOutCoordinator::new(self.adapters.clone(), self.config.fanout.window());
        let report = match coordinator.collect().await {
            Ok(report) => report,
            Err(NewsflowError::NoSourcesAvailable) => {
                run.fail(FailureReason::NoSourcesAvailable);
                self.store.save(&run).await?;
                tracing::warn!(run_id = %run.id, "run failed: no sources available");
                return Ok(run);
            }
            Err(other) => return Err(other),
        };

        for failure in &report.failed {
            run.state
                .record_failure(format!("{}: {}", failure.adapter, failure.error));
        }
        run.state.raw_items = report.items;
        run.touch();
        self.store.save(&run).await?;

        run.enter_stage(stage_names::DEDUP);
        run.state.ranked = dedup::rank(&run.state.raw_items, &self.config.dedup);
        tracing::info!(
            run_id = %run.id,
            raw = run.state.raw_items.len(),
            ranked = run.state.ranked.len(),
            "dedup complete"
        );
        self.store.save(&run).await?;

        if !self.run_stages(&mut run, &PipelineStage::PRE_GATE).await? {
            return Ok(run);
        }

        self.gate.park(&mut run).await?;
        Ok(run)
    }

    /// Resumes a suspended run from an inbound token.
    ///
    /// `feedback` is attached to the decision and, on revise, appended to
    /// the state for the next drafting pass.
    pub async fn resume(
        &self,
        token: &str,
        feedback: Option<String>,
    ) -> Result<ResumeOutcome, NewsflowError> {
        self.resume_at(token, feedback, Utc::now()).await
    }

    /// Resumes with an explicit clock.
    pub async fn resume_at(
        &self,
        token: &str,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ResumeOutcome, NewsflowError> {
        let (mut run, claims) = match self.verifier.admit_at(token, now).await? {
            Admission::Granted { run, claims } => (run, claims),
            Admission::Denied(outcome) => return Ok(outcome),
        };

        run.state.decision = Some(Decision {
            intent: claims.action,
            feedback: feedback.clone(),
            decided_at: now,
        });

        match claims.action {
            DecisionIntent::Reject => {
                run.status = RunStatus::Rejected;
                run.touch();
                self.store.save(&run).await?;
                tracing::info!(run_id = %run.id, "run rejected by reviewer");
            }
            DecisionIntent::Approve => {
                if self
                    .run_stages(&mut run, PipelineStage::route(claims.action))
                    .await?
                {
                    run.status = RunStatus::Completed;
                    run.touch();
                    self.store.save(&run).await?;
                    tracing::info!(run_id = %run.id, "run completed");
                }
            }
            DecisionIntent::Revise => {
                if let Some(feedback) = feedback {
                    run.state.push_feedback(feedback);
                }
                run.state.revisions += 1;
                if run.state.revisions > self.config.gate.max_revisions {
                    run.fail(FailureReason::RevisionLimitExceeded {
                        limit: self.config.gate.max_revisions,
                    });
                    self.store.save(&run).await?;
                    tracing::warn!(run_id = %run.id, "run failed: revision limit exceeded");
                } else {
                    self.store.save(&run).await?;
                    if self
                        .run_stages(&mut run, PipelineStage::route(claims.action))
                        .await?
                    {
                        self.gate.park(&mut run).await?;
                    }
                }
            }
        }

        Ok(ResumeOutcome::Resumed {
            run_id: run.id,
            status: run.status,
        })
    }

    /// Administratively aborts a run.
    ///
    /// Returns `true` if the run was non-terminal and is now failed. The
    /// last committed pipeline state is left intact for inspection; any
    /// in-flight stage work observes the flag before its next transition
    /// and stops cleanly.
    pub async fn abort(
        &self,
        run_id: Uuid,
        reason: impl Into<String>,
    ) -> Result<bool, NewsflowError> {
        let reason = reason.into();
        for from in [RunStatus::Running, RunStatus::Suspended] {
            if self.store.transition(run_id, from, RunStatus::Failed).await? {
                if let Some(mut run) = self.store.load(run_id).await? {
                    run.failure = Some(FailureReason::Aborted {
                        reason: reason.clone(),
                    });
                    run.touch();
                    self.store.save(&run).await?;
                }
                tracing::warn!(run_id = %run_id, reason = %reason, "run aborted");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Loads a run's current record. Every terminal state stays queryable.
    pub async fn run(&self, run_id: Uuid) -> Result<Option<Run>, NewsflowError> {
        Ok(self.store.load(run_id).await?)
    }

    /// Reconstructs a suspended run's preview and pending actions without
    /// re-running any stage.
    pub async fn preview(&self, run_id: Uuid) -> Result<ReviewPreview, NewsflowError> {
        let run = self.suspended(run_id).await?;
        Ok(self.gate.preview(&run))
    }

    /// Re-mints tokens for a suspended run and re-notifies the reviewer.
    pub async fn resend(&self, run_id: Uuid) -> Result<ReviewRequest, NewsflowError> {
        let mut run = self.suspended(run_id).await?;
        // park() re-persists the same suspended snapshot, which is harmless,
        // and reuses the notify-failure tolerance.
        self.gate.park(&mut run).await
    }

    async fn suspended(&self, run_id: Uuid) -> Result<Run, NewsflowError> {
        let run = self
            .store
            .load(run_id)
            .await?
            .ok_or(NewsflowError::RunNotFound(run_id))?;
        if run.status != RunStatus::Suspended {
            return Err(NewsflowError::RunNotSuspended {
                run_id,
                status: run.status,
            });
        }
        Ok(run)
    }

    /// Runs a sequence of stages, committing state after each one.
    ///
    /// Returns `false` when the run went terminal (stage failure or
    /// administrative abort) and the caller should stop.
    async fn run_stages(
        &self,
        run: &mut Run,
        stages: &[PipelineStage],
    ) -> Result<bool, NewsflowError> {
        for stage in stages {
            // Abort flag check before every transition.
            if let Some(stored) = self.store.load(run.id).await? {
                if stored.status == RunStatus::Failed {
                    tracing::info!(run_id = %run.id, stage = stage.name(), "abort observed; stopping");
                    *run = stored;
                    return Ok(false);
                }
            }

            run.enter_stage(stage.name());
            tracing::info!(run_id = %run.id, stage = stage.name(), "stage started");
            match stage
                .apply(&run.state, self.backend.as_ref(), &self.config)
                .await
            {
                Ok(next) => {
                    run.state = next;
                    run.touch();
                    self.store.save(run).await?;
                    tracing::info!(run_id = %run.id, stage = stage.name(), "stage completed");
                }
                Err(failure) => {
                    run.fail(FailureReason::Stage {
                        stage: failure.stage.to_string(),
                        reason: failure.reason.clone(),
                    });
                    self.store.save(run).await?;
                    tracing::warn!(run_id = %run.id, stage = stage.name(), error = %failure, "stage failed");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
