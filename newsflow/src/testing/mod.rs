//! Scripted collaborators and fixtures for tests.
//!
//! Everything here is deterministic: the scripted backend answers by task
//! name with a fixed response, which is what makes stage replay and
//! restart-durability tests meaningful.

use crate::backend::{GenerationBackend, GenerationError, GenerationOutput, GenerationRequest};
use crate::core::{CandidateItem, ScoredItem};
use crate::notify::{Notifier, NotifyError, ReviewRequest};
use crate::sources::{SourceAdapter, SourceError};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A source adapter with a scripted result.
pub struct ScriptedAdapter {
    id: String,
    items: Vec<CandidateItem>,
    fail: bool,
    delay: Option<Duration>,
}

impl ScriptedAdapter {
    /// An adapter that returns the given items.
    #[must_use]
    pub fn new(id: impl Into<String>, items: Vec<CandidateItem>) -> Self {
        Self {
            id: id.into(),
            items,
            fail: false,
            delay: None,
        }
    }

    /// An adapter that always fails.
    #[must_use]
    pub fn failing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
            fail: true,
            delay: None,
        }
    }

    /// Delays the response, for timeout tests.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, _deadline: Duration) -> Result<Vec<CandidateItem>, SourceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SourceError::Unavailable("scripted failure".to_string()));
        }
        Ok(self.items.clone())
    }
}

/// A deterministic generation backend that answers by task name.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: HashMap<String, String>,
    transient_failures: AtomicUsize,
    always_fatal: bool,
    calls: AtomicUsize,
    last: Mutex<Option<GenerationRequest>>,
}

impl ScriptedBackend {
    /// Creates a backend with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response for a task.
    #[must_use]
    pub fn respond(mut self, task: impl Into<String>, content: impl Into<String>) -> Self {
        self.responses.insert(task.into(), content.into());
        self
    }

    /// Makes the next `count` calls fail transiently before recovering.
    #[must_use]
    pub fn fail_transient(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Makes every call fail fatally.
    #[must_use]
    pub fn always_fatal(mut self) -> Self {
        self.always_fatal = true;
        self
    }

    /// Total calls seen.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last.lock().clone()
    }

    /// A backend scripted for the whole digest pipeline over `item_count`
    /// ranked items.
    #[must_use]
    pub fn for_digest(item_count: usize) -> Self {
        let tags: Vec<String> = (0..item_count)
            .map(|i| format!(r#"{{"index": {i}, "topic": "llm", "relevance": 0.8}}"#))
            .collect();
        let classify = format!("[{}]", tags.join(", "));
        let synthesize = r#"[{"headline": "Top story of the week",
            "body": "Something substantial happened and it matters.",
            "topic": "llm", "source_url": "https://example.com/top", "credibility": 0.9}]"#;
        let draft = "A big week in AI.\n\n→ Something substantial happened.\n\nWhat did you ship?\n\n#ai #ml";

        Self::new()
            .respond("classify", classify)
            .respond("synthesize", synthesize)
            .respond("draft", draft)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(request.clone());

        if self.always_fatal {
            return Err(GenerationError::Fatal("scripted fatal failure".to_string()));
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(GenerationError::Transient(
                "scripted transient failure".to_string(),
            ));
        }

        match self.responses.get(&request.task) {
            Some(content) => Ok(GenerationOutput::text(content.clone())),
            None => Err(GenerationError::Fatal(format!(
                "no scripted response for task '{}'",
                request.task
            ))),
        }
    }
}

/// A notifier that records every delivered request.
#[derive(Default)]
pub struct CapturingNotifier {
    requests: Mutex<Vec<ReviewRequest>>,
}

impl CapturingNotifier {
    /// Creates an empty capturing notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently delivered request.
    #[must_use]
    pub fn last(&self) -> Option<ReviewRequest> {
        self.requests.lock().last().cloned()
    }

    /// Total deliveries.
    #[must_use]
    pub fn delivery_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn notify(&self, request: &ReviewRequest) -> Result<(), NotifyError> {
        self.requests.lock().push(request.clone());
        Ok(())
    }
}

/// A notifier that always fails delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _request: &ReviewRequest) -> Result<(), NotifyError> {
        Err(NotifyError("scripted delivery failure".to_string()))
    }
}

/// Builds a candidate item published `days_old` days ago.
#[must_use]
pub fn candidate(
    source: &str,
    url: &str,
    title: &str,
    body: &str,
    days_old: i64,
) -> CandidateItem {
    CandidateItem::new(
        source,
        url,
        title,
        body,
        Utc::now() - chrono::Duration::days(days_old),
    )
}

/// Builds a single-source scored item.
#[must_use]
pub fn scored(title: &str, url: &str, score: f64) -> ScoredItem {
    let item = candidate("rss", url, title, "body text for the story", 0);
    let sources = std::iter::once(item.source.clone()).collect();
    ScoredItem {
        item,
        score,
        sources,
    }
}
