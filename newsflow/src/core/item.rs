//! Candidate and scored content items plus the normalization helpers the
//! same-story rule is built on.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

/// Reputation class of an item's originating source.
///
/// Used as the lookup fallback when a source identifier is absent from the
/// reputation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceClass {
    /// Wire services and major newsrooms.
    Wire,
    /// Established tech journalism.
    Established,
    /// Research venues and preprint servers.
    Research,
    /// Blogs and aggregators.
    Blog,
    /// Unclassified source.
    Unknown,
}

impl Default for SourceClass {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for SourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire => write!(f, "wire"),
            Self::Established => write!(f, "established"),
            Self::Research => write!(f, "research"),
            Self::Blog => write!(f, "blog"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One unit of content as produced by a source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Source identifier, e.g. `"rss:techcrunch"` or `"arxiv"`.
    pub source: String,
    /// Canonical identifier of the underlying resource.
    pub canonical_id: String,
    /// Original URL.
    pub url: String,
    /// Item title.
    pub title: String,
    /// Full text or snippet.
    pub body: String,
    /// Publication timestamp.
    pub published_at: DateTime<Utc>,
    /// Reputation class of the source.
    #[serde(default)]
    pub class: SourceClass,
}

impl CandidateItem {
    /// Creates a new candidate item. The canonical identifier defaults to the
    /// normalized URL.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        let url = url.into();
        Self {
            source: source.into(),
            canonical_id: normalize_url(&url),
            url,
            title: title.into(),
            body: body.into(),
            published_at,
            class: SourceClass::Unknown,
        }
    }

    /// Overrides the canonical identifier.
    #[must_use]
    pub fn with_canonical_id(mut self, id: impl Into<String>) -> Self {
        self.canonical_id = id.into();
        self
    }

    /// Sets the source reputation class.
    #[must_use]
    pub fn with_class(mut self, class: SourceClass) -> Self {
        self.class = class;
        self
    }

    /// Deterministic hash of the item body, usable as a dedup cache key.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.body.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

/// A deduplicated item annotated with a credibility score and merged
/// provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    /// The representative item for its duplicate group.
    pub item: CandidateItem,
    /// Credibility score in `[0, 1]`.
    pub score: f64,
    /// Every source that reported this story. `BTreeSet` keeps provenance
    /// iteration deterministic.
    pub sources: BTreeSet<String>,
}

impl ScoredItem {
    /// Number of distinct corroborating sources.
    #[must_use]
    pub fn corroboration(&self) -> usize {
        self.sources.len()
    }
}

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9\s]+").expect("static pattern"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("static pattern"))
}

/// Normalizes a title for similarity comparison: lowercase, punctuation
/// stripped, whitespace collapsed.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let lower = title.to_lowercase();
    let stripped = title_pattern().replace_all(&lower, " ");
    whitespace_pattern()
        .replace_all(stripped.trim(), " ")
        .into_owned()
}

/// Normalizes a URL to its resource identity: scheme, `www.`, query,
/// fragment, and trailing slashes are ignored.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let mut rest = url.trim().to_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(stripped) = rest.strip_prefix(scheme) {
            rest = stripped.to_string();
            break;
        }
    }
    if let Some(stripped) = rest.strip_prefix("www.") {
        rest = stripped.to_string();
    }
    if let Some(idx) = rest.find(['?', '#']) {
        rest.truncate(idx);
    }
    while rest.ends_with('/') {
        rest.pop();
    }
    rest
}
