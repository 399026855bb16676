//! Generation backend seam and its retry wrapper.
//!
//! The backend is a black box that is expected to fail sometimes. Failures
//! are explicit values, not exceptions: [`GenerationError::Transient`] is
//! retried with exponential backoff and full jitter, [`GenerationError::Fatal`]
//! and retry exhaustion surface to the stage as a failure.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A structured prompt for the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Task label, e.g. `"classify"` or `"draft"`. Stable across replays.
    pub task: String,
    /// System framing for the call.
    #[serde(default)]
    pub system: String,
    /// Task input assembled from pipeline state.
    pub input: String,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
}

impl GenerationRequest {
    /// Creates a request for a task.
    #[must_use]
    pub fn new(task: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            system: String::new(),
            input: input.into(),
            temperature: 0.0,
        }
    }

    /// Sets the system framing.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Output of a generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Generated text or serialized structure.
    pub content: String,
    /// Model identifier, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Wall-clock latency, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

impl GenerationOutput {
    /// Creates an output carrying only content.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
            latency_ms: None,
        }
    }
}

/// Error from a generation call.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Worth retrying: rate limits, timeouts, transport hiccups.
    #[error("transient generation error: {0}")]
    Transient(String),
    /// Not worth retrying: bad request, content refusal, auth.
    #[error("fatal generation error: {0}")]
    Fatal(String),
}

impl GenerationError {
    /// True if the retry wrapper should try again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// The language-generation backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Runs one generation call.
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationOutput, GenerationError>;
}

/// Retry policy for backend calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,
    /// Apply full jitter to delays.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_call_timeout() -> u64 {
    20_000
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            call_timeout_ms: default_call_timeout(),
            jitter: default_jitter(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Disables jitter (deterministic delays, mainly for tests).
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// The per-call timeout as a [`Duration`].
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Delay before the given retry (1-indexed), exponential with optional
    /// full jitter, capped at the configured maximum.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(retry.saturating_sub(1)))
            .min(self.max_delay_ms);
        let millis = if self.jitter && exp > 0 {
            rand::thread_rng().gen_range(0..=exp)
        } else {
            exp
        };
        Duration::from_millis(millis)
    }
}

/// Runs a backend call under the retry policy.
///
/// Each attempt is bounded by the per-call timeout; a timeout counts as a
/// transient failure. Only transient errors are retried.
///
/// # Errors
///
/// Returns the last error once the budget is exhausted, or the first fatal
/// error immediately.
pub async fn with_retries<F, Fut>(
    policy: &RetryPolicy,
    task: &str,
    mut operation: F,
) -> Result<GenerationOutput, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<GenerationOutput, GenerationError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let result = match tokio::time::timeout(policy.call_timeout(), operation()).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Transient("call timed out".to_string())),
        };

        match result {
            Ok(output) => return Ok(output),
            Err(error) if error.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    task,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying generation call"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                tracing::warn!(task, attempt, error = %error, "generation call gave up");
                return Err(error);
            }
        }
    }
}
