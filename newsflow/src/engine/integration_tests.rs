//! End-to-end engine tests: fan-out through suspension, resumption, and
//! every post-gate route, including restart and race scenarios.

use super::Engine;
use crate::backend::RetryPolicy;
use crate::config::EngineConfig;
use crate::core::{DecisionIntent, FailureReason, RunStatus};
use crate::errors::NewsflowError;
use crate::gate::TokenSigner;
use crate::notify::{Notifier, ReviewRequest};
use crate::resume::ResumeOutcome;
use crate::sources::SourceAdapter;
use crate::store::{InMemoryRunStore, RunStore};
use crate::testing::{candidate, CapturingNotifier, ScriptedAdapter, ScriptedBackend};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

const SECRET: &[u8] = b"integration-secret";

struct Harness {
    engine: Arc<Engine>,
    store: Arc<InMemoryRunStore>,
    notifier: Arc<CapturingNotifier>,
}

fn fast_config() -> EngineConfig {
    EngineConfig::new().with_retry(
        RetryPolicy::new()
            .with_max_attempts(3)
            .with_base_delay_ms(1)
            .without_jitter(),
    )
}

fn default_adapters() -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(ScriptedAdapter::new(
            "rss",
            vec![candidate(
                "rss",
                "https://example.com/x",
                "Story X",
                "story x body from rss",
                0,
            )],
        )),
        Arc::new(ScriptedAdapter::new(
            "arxiv",
            vec![candidate(
                "arxiv",
                "https://example.com/x",
                "Story X",
                "story x much longer body from arxiv",
                0,
            )],
        )),
        Arc::new(ScriptedAdapter::new(
            "search",
            vec![candidate(
                "search",
                "https://example.com/y",
                "Story Y",
                "story y body",
                1,
            )],
        )),
    ]
}

fn harness_with(
    adapters: Vec<Arc<dyn SourceAdapter>>,
    backend: ScriptedBackend,
    config: EngineConfig,
) -> Harness {
    let store = Arc::new(InMemoryRunStore::new());
    let notifier = Arc::new(CapturingNotifier::new());
    let engine = Arc::new(Engine::new(
        Arc::clone(&store) as Arc<dyn RunStore>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Arc::new(backend),
        adapters,
        TokenSigner::new(SECRET.to_vec()),
        config,
    ));
    Harness {
        engine,
        store,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(
        default_adapters(),
        ScriptedBackend::for_digest(2),
        fast_config(),
    )
}

async fn suspended_run(harness: &Harness) -> (Uuid, ReviewRequest) {
    let run = harness.engine.start().await.unwrap();
    assert_eq!(run.status, RunStatus::Suspended);
    let request = harness.notifier.last().unwrap();
    (run.id, request)
}

#[tokio::test]
async fn test_start_parks_at_gate_with_merged_stories() {
    let harness = harness();
    let run = harness.engine.start().await.unwrap();

    assert_eq!(run.status, RunStatus::Suspended);
    assert_eq!(run.stage, "await_review");
    // Story X from rss+arxiv merged into one item that outranks story Y.
    assert_eq!(run.state.ranked.len(), 2);
    let top = &run.state.ranked[0];
    assert_eq!(
        top.sources.iter().cloned().collect::<Vec<_>>(),
        vec!["arxiv".to_string(), "rss".to_string()]
    );
    assert!(top.score > run.state.ranked[1].score);
    // Every pre-gate stage left its output in place.
    assert!(!run.state.topics.is_empty());
    assert!(!run.state.summaries.is_empty());
    assert!(run.state.draft.is_some());
    assert!(!run.state.assets.is_empty());
    assert_eq!(harness.notifier.delivery_count(), 1);
}

#[tokio::test]
async fn test_approve_completes_and_publishes() {
    let harness = harness();
    let (run_id, request) = suspended_run(&harness).await;

    let outcome = harness
        .engine
        .resume(&request.approve.value, None)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ResumeOutcome::Resumed {
            run_id,
            status: RunStatus::Completed
        }
    );

    let run = harness.engine.run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.state.published.is_some());
    assert_eq!(
        run.state.decision.as_ref().unwrap().intent,
        DecisionIntent::Approve
    );
}

#[tokio::test]
async fn test_reject_is_terminal() {
    let harness = harness();
    let (run_id, request) = suspended_run(&harness).await;

    let outcome = harness
        .engine
        .resume(&request.reject.value, None)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ResumeOutcome::Resumed {
            run_id,
            status: RunStatus::Rejected
        }
    );

    let run = harness.engine.run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Rejected);
    assert!(run.state.published.is_none());
}

#[tokio::test]
async fn test_revise_loops_back_to_gate_with_feedback() {
    let harness = harness();
    let (run_id, request) = suspended_run(&harness).await;

    let outcome = harness
        .engine
        .resume(&request.revise.value, Some("punchier hook".to_string()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ResumeOutcome::Resumed {
            run_id,
            status: RunStatus::Suspended
        }
    );

    let run = harness.engine.run(run_id).await.unwrap().unwrap();
    assert_eq!(run.state.revisions, 1);
    assert_eq!(run.state.feedback, vec!["punchier hook".to_string()]);
    assert_eq!(run.state.draft.as_ref().unwrap().revision, 1);
    // A fresh review request went out with new tokens.
    assert_eq!(harness.notifier.delivery_count(), 2);
    let second = harness.notifier.last().unwrap();
    assert_ne!(
        second.approve.claims.token_id,
        request.approve.claims.token_id
    );
}

#[tokio::test]
async fn test_revision_limit_forces_failure() {
    let harness = harness_with(
        default_adapters(),
        ScriptedBackend::for_digest(2),
        fast_config().with_max_revisions(1),
    );
    let (run_id, first) = suspended_run(&harness).await;

    let outcome = harness
        .engine
        .resume(&first.revise.value, Some("again".to_string()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ResumeOutcome::Resumed {
            run_id,
            status: RunStatus::Suspended
        }
    );

    let second = harness.notifier.last().unwrap();
    let outcome = harness
        .engine
        .resume(&second.revise.value, Some("and again".to_string()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ResumeOutcome::Resumed {
            run_id,
            status: RunStatus::Failed
        }
    );

    let run = harness.engine.run(run_id).await.unwrap().unwrap();
    assert_eq!(
        run.failure,
        Some(FailureReason::RevisionLimitExceeded { limit: 1 })
    );
}

#[tokio::test]
async fn test_partial_adapter_failure_is_absorbed() {
    let mut adapters = default_adapters();
    adapters.push(Arc::new(ScriptedAdapter::failing("broken")));
    let harness = harness_with(adapters, ScriptedBackend::for_digest(2), fast_config());

    let run = harness.engine.start().await.unwrap();
    assert_eq!(run.status, RunStatus::Suspended);
    assert_eq!(run.state.ranked.len(), 2);
    assert!(run
        .state
        .failures
        .iter()
        .any(|entry| entry.starts_with("broken:")));
}

#[tokio::test]
async fn test_all_adapters_failing_fails_run() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(ScriptedAdapter::failing("rss")),
        Arc::new(ScriptedAdapter::failing("search")),
    ];
    let harness = harness_with(adapters, ScriptedBackend::for_digest(2), fast_config());

    let run = harness.engine.start().await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.failure, Some(FailureReason::NoSourcesAvailable));

    // Terminal state stays queryable.
    let loaded = harness.engine.run(run.id).await.unwrap().unwrap();
    assert_eq!(loaded.failure, Some(FailureReason::NoSourcesAvailable));
}

#[tokio::test]
async fn test_fatal_backend_failure_names_the_stage() {
    let harness = harness_with(
        default_adapters(),
        ScriptedBackend::new().always_fatal(),
        fast_config(),
    );

    let run = harness.engine.start().await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.stage, "classify");
    match run.failure {
        Some(FailureReason::Stage { ref stage, .. }) => assert_eq!(stage, "classify"),
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_backend_failures_are_retried() {
    let backend = ScriptedBackend::for_digest(2).fail_transient(2);
    let harness = harness_with(default_adapters(), backend, fast_config());

    let run = harness.engine.start().await.unwrap();
    assert_eq!(run.status, RunStatus::Suspended);
}

#[tokio::test]
async fn test_resumption_survives_process_restart() {
    let harness = harness();
    let (run_id, request) = suspended_run(&harness).await;

    // Simulate total process loss: a brand new engine over the same store
    // and signing secret, nothing carried over in memory.
    let restarted = Engine::new(
        Arc::clone(&harness.store) as Arc<dyn RunStore>,
        Arc::new(CapturingNotifier::new()) as Arc<dyn Notifier>,
        Arc::new(ScriptedBackend::for_digest(2)),
        default_adapters(),
        TokenSigner::new(SECRET.to_vec()),
        fast_config(),
    );

    let outcome = restarted
        .resume(&request.approve.value, None)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ResumeOutcome::Resumed {
            run_id,
            status: RunStatus::Completed
        }
    );

    let run = restarted.run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.state.published.is_some());
    // The continuation ran on the rehydrated snapshot, not recomputed data.
    assert_eq!(run.state.ranked.len(), 2);
    assert!(run.state.draft.is_some());
}

#[tokio::test]
async fn test_token_reuse_rejected_after_success() {
    let harness = harness();
    let (_, request) = suspended_run(&harness).await;

    harness
        .engine
        .resume(&request.approve.value, None)
        .await
        .unwrap();
    let outcome = harness
        .engine
        .resume(&request.approve.value, None)
        .await
        .unwrap();
    assert_eq!(outcome, ResumeOutcome::AlreadyUsed);
}

#[tokio::test]
async fn test_concurrent_resumptions_single_winner() {
    let harness = harness();
    let (_, request) = suspended_run(&harness).await;

    let approve = request.approve.value.clone();
    let reject = request.reject.value.clone();
    let engine_a = Arc::clone(&harness.engine);
    let engine_b = Arc::clone(&harness.engine);

    let (first, second) = tokio::join!(
        tokio::spawn(async move { engine_a.resume(&approve, None).await }),
        tokio::spawn(async move { engine_b.resume(&reject, None).await }),
    );
    let outcomes = [
        first.unwrap().unwrap(),
        second.unwrap().unwrap(),
    ];

    let winners = outcomes
        .iter()
        .filter(|o| matches!(o, ResumeOutcome::Resumed { .. }))
        .count();
    assert_eq!(winners, 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, ResumeOutcome::NotSuspended)));
}

#[tokio::test]
async fn test_forged_token_rejected() {
    let harness = harness();
    let (_, _) = suspended_run(&harness).await;

    // A token minted with a different secret never resumes anything.
    let forger = TokenSigner::new(b"attacker-secret".to_vec());
    let run_id = harness.notifier.last().unwrap().preview.run_id;
    let forged = forger
        .mint(run_id, DecisionIntent::Approve, Duration::hours(1))
        .unwrap();

    let outcome = harness.engine.resume(&forged.value, None).await.unwrap();
    assert_eq!(outcome, ResumeOutcome::InvalidToken);

    let run = harness.engine.run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Suspended);
}

#[tokio::test]
async fn test_expired_token_leaves_run_resumable() {
    let harness = harness();
    let (run_id, request) = suspended_run(&harness).await;

    // Issued with the default 72h window, verified at hour 73.
    let outcome = harness
        .engine
        .resume_at(
            &request.approve.value,
            None,
            Utc::now() + Duration::hours(73),
        )
        .await
        .unwrap();
    assert_eq!(outcome, ResumeOutcome::ExpiredToken);

    // The run stays suspended and an administrative resend still works.
    let run = harness.engine.run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Suspended);
    let reissued = harness.engine.resend(run_id).await.unwrap();
    let outcome = harness
        .engine
        .resume(&reissued.approve.value, None)
        .await
        .unwrap();
    assert!(matches!(outcome, ResumeOutcome::Resumed { .. }));
}

#[tokio::test]
async fn test_abort_stops_resumption() {
    let harness = harness();
    let (run_id, request) = suspended_run(&harness).await;

    assert!(harness.engine.abort(run_id, "operator abort").await.unwrap());

    let outcome = harness
        .engine
        .resume(&request.approve.value, None)
        .await
        .unwrap();
    assert_eq!(outcome, ResumeOutcome::NotSuspended);

    let run = harness.engine.run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(matches!(
        run.failure,
        Some(FailureReason::Aborted { .. })
    ));
    // Last committed state is intact for inspection.
    assert!(run.state.draft.is_some());
}

#[tokio::test]
async fn test_abort_terminal_run_is_a_noop() {
    let harness = harness();
    let (run_id, request) = suspended_run(&harness).await;
    harness
        .engine
        .resume(&request.reject.value, None)
        .await
        .unwrap();

    assert!(!harness.engine.abort(run_id, "too late").await.unwrap());
}

#[tokio::test]
async fn test_preview_reconstructable_without_rerunning_stages() {
    let harness = harness();
    let (run_id, request) = suspended_run(&harness).await;

    let preview = harness.engine.preview(run_id).await.unwrap();
    assert_eq!(preview.run_id, run_id);
    assert_eq!(preview.draft_excerpt, request.preview.draft_excerpt);
    assert_eq!(preview.pending.len(), 3);

    assert!(matches!(
        harness.engine.preview(Uuid::new_v4()).await,
        Err(NewsflowError::RunNotFound(_))
    ));

    harness
        .engine
        .resume(&request.approve.value, None)
        .await
        .unwrap();
    assert!(matches!(
        harness.engine.preview(run_id).await,
        Err(NewsflowError::RunNotSuspended { .. })
    ));
}

#[tokio::test]
async fn test_stage_replay_is_idempotent() {
    use crate::stages::PipelineStage;

    let harness = harness();
    let run = harness.engine.start().await.unwrap();

    // Crash-and-retry simulation: applying a stage twice to the same state
    // with the deterministic backend changes nothing.
    let backend = ScriptedBackend::for_digest(2);
    let config = fast_config();
    let once = PipelineStage::Classify
        .apply(&run.state, &backend, &config)
        .await
        .unwrap();
    let twice = PipelineStage::Classify
        .apply(&once, &backend, &config)
        .await
        .unwrap();
    assert_eq!(once.topics, twice.topics);
    assert_eq!(once.summaries, twice.summaries);
    assert_eq!(once.draft, twice.draft);
}

#[tokio::test]
async fn test_independent_runs_do_not_interfere() {
    let harness = harness();
    let (first_id, first_request) = suspended_run(&harness).await;
    let (second_id, second_request) = suspended_run(&harness).await;
    assert_ne!(first_id, second_id);

    harness
        .engine
        .resume(&first_request.approve.value, None)
        .await
        .unwrap();

    // The second run is untouched by the first run's resumption.
    let second = harness.engine.run(second_id).await.unwrap().unwrap();
    assert_eq!(second.status, RunStatus::Suspended);
    let outcome = harness
        .engine
        .resume(&second_request.reject.value, None)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ResumeOutcome::Resumed {
            run_id: second_id,
            status: RunStatus::Rejected
        }
    );
}
