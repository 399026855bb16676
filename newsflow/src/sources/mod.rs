//! Source adapters and the fan-out coordinator.
//!
//! Each adapter wraps one external data source. The coordinator invokes all
//! of them concurrently under a shared collection window and tolerates any
//! subset of them failing; only a total failure stops the run.

use crate::core::CandidateItem;
use crate::errors::NewsflowError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error returned by a source adapter.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The source could not be reached or returned garbage.
    #[error("source unavailable: {0}")]
    Unavailable(String),
    /// The adapter did not finish inside the collection window.
    #[error("source timed out")]
    Timeout,
}

/// A single external data source.
///
/// Adapters must honor the supplied deadline and prefer returning partial
/// or empty results over hanging.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable adapter identifier, e.g. `"rss:techcrunch"`.
    fn id(&self) -> &str;

    /// Fetches candidate items from the source.
    async fn fetch(&self, deadline: Duration) -> Result<Vec<CandidateItem>, SourceError>;
}

/// One adapter's failure, as recorded in the fan-out report.
#[derive(Debug, Clone)]
pub struct AdapterFailure {
    /// The failing adapter's id.
    pub adapter: String,
    /// What went wrong.
    pub error: SourceError,
}

/// Result of one fan-out round.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Concatenation of all successful adapters' items, unordered.
    pub items: Vec<CandidateItem>,
    /// Adapters that failed or timed out this round.
    pub failed: Vec<AdapterFailure>,
}

/// Invokes all registered adapters concurrently with per-adapter failure
/// isolation.
pub struct FanOutCoordinator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    window: Duration,
}

impl FanOutCoordinator {
    /// Creates a coordinator over the given adapters.
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, window: Duration) -> Self {
        Self { adapters, window }
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Runs one fan-out round.
    ///
    /// Each adapter gets its own task and the shared window as a deadline.
    /// A panicking, failing, or timed-out adapter is recorded and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`NewsflowError::NoSourcesAvailable`] when no adapter is
    /// registered or every adapter failed.
    pub async fn collect(&self) -> Result<FanOutReport, NewsflowError> {
        if self.adapters.is_empty() {
            return Err(NewsflowError::NoSourcesAvailable);
        }

        let window = self.window;
        let handles: Vec<_> = self
            .adapters
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let id = adapter.id().to_string();
                let handle = tokio::spawn(async move {
                    match tokio::time::timeout(window, adapter.fetch(window)).await {
                        Ok(result) => result,
                        Err(_) => Err(SourceError::Timeout),
                    }
                });
                (id, handle)
            })
            .collect();

        let joined = futures::future::join_all(
            handles
                .into_iter()
                .map(|(id, handle)| async move { (id, handle.await) }),
        )
        .await;

        let mut report = FanOutReport::default();
        for (id, outcome) in joined {
            match outcome {
                Ok(Ok(items)) => {
                    tracing::debug!(adapter = %id, count = items.len(), "adapter returned");
                    report.items.extend(items);
                }
                Ok(Err(error)) => {
                    tracing::warn!(adapter = %id, error = %error, "adapter failed");
                    report.failed.push(AdapterFailure { adapter: id, error });
                }
                Err(join_error) => {
                    tracing::warn!(adapter = %id, error = %join_error, "adapter panicked");
                    report.failed.push(AdapterFailure {
                        adapter: id,
                        error: SourceError::Unavailable(join_error.to_string()),
                    });
                }
            }
        }

        if report.items.is_empty() && report.failed.len() == self.adapters.len() {
            return Err(NewsflowError::NoSourcesAvailable);
        }

        tracing::info!(
            items = report.items.len(),
            failed_adapters = report.failed.len(),
            "fan-out complete"
        );
        Ok(report)
    }
}
