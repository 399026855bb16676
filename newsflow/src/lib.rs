//! # Newsflow
//!
//! A resumable multi-source news digest pipeline with human-in-the-loop
//! approval.
//!
//! Newsflow drives one content run end to end:
//!
//! - **Fan-out**: every registered source adapter is queried concurrently
//!   under a shared window; any subset may fail without stopping the run
//! - **Dedup & scoring**: near-duplicate stories collapse into one item
//!   with merged provenance and a credibility score
//! - **Stages**: a fixed sequence of transformation stages (classify,
//!   synthesize, draft, assets) over an append-only state accumulator
//! - **Suspension**: the run parks durably at a review gate, holding no
//!   thread or connection, for as long as the reviewer takes
//! - **Resumption**: a signed, single-use token carries the reviewer's
//!   decision back and routes the run to publish, rejection, or another
//!   drafting pass
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use newsflow::prelude::*;
//!
//! let engine = Engine::new(store, notifier, backend, adapters, signer, config);
//! let run = engine.start().await?;           // parks at the gate
//! // ... reviewer clicks a link hours later ...
//! let outcome = engine.resume(&token, None).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod config;
pub mod core;
pub mod dedup;
pub mod engine;
pub mod errors;
pub mod gate;
pub mod notify;
pub mod observability;
pub mod resume;
pub mod run;
pub mod sources;
pub mod stages;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{
        GenerationBackend, GenerationError, GenerationOutput, GenerationRequest, RetryPolicy,
    };
    pub use crate::config::EngineConfig;
    pub use crate::core::{
        CandidateItem, DecisionIntent, FailureReason, RunStatus, ScoredItem, SourceClass,
    };
    pub use crate::engine::Engine;
    pub use crate::errors::NewsflowError;
    pub use crate::gate::{ResumptionToken, TokenError, TokenSigner};
    pub use crate::notify::{LoggingNotifier, Notifier, ReviewPreview, ReviewRequest};
    pub use crate::resume::ResumeOutcome;
    pub use crate::run::{PipelineState, Run};
    pub use crate::sources::{FanOutCoordinator, SourceAdapter, SourceError};
    pub use crate::stages::PipelineStage;
    pub use crate::store::{InMemoryRunStore, RunStore};
}
