//! Artifacts accumulated by the transformation stages.

use super::DecisionIntent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic buckets used by the classification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Large language models.
    Llm,
    /// Computer vision.
    Vision,
    /// Robotics.
    Robotics,
    /// Policy and regulation.
    Policy,
    /// Startups and funding.
    Startup,
    /// Research papers.
    Research,
    /// General industry news.
    Industry,
    /// Everything else.
    Other,
}

impl Default for Topic {
    fn default() -> Self {
        Self::Other
    }
}

impl Topic {
    /// Parses a lenient label as emitted by the generation backend. Unknown
    /// labels map to [`Topic::Other`].
    #[must_use]
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "llm" | "language model" | "language models" => Self::Llm,
            "vision" | "computer vision" => Self::Vision,
            "robotics" => Self::Robotics,
            "policy" | "ai policy" | "regulation" => Self::Policy,
            "startup" | "ai startup" | "funding" => Self::Startup,
            "research" | "research paper" => Self::Research,
            "industry" | "industry news" => Self::Industry,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Llm => write!(f, "llm"),
            Self::Vision => write!(f, "vision"),
            Self::Robotics => write!(f, "robotics"),
            Self::Policy => write!(f, "policy"),
            Self::Startup => write!(f, "startup"),
            Self::Research => write!(f, "research"),
            Self::Industry => write!(f, "industry"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Classification output for one ranked item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicTag {
    /// Canonical id of the tagged item.
    pub canonical_id: String,
    /// Assigned topic.
    pub topic: Topic,
    /// Relevance for practitioners in `[0, 1]`.
    pub relevance: f64,
}

/// One synthesized digest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Short headline.
    pub headline: String,
    /// Two to three sentence body.
    pub body: String,
    /// Topic bucket.
    #[serde(default)]
    pub topic: Topic,
    /// URLs of the underlying items.
    #[serde(default)]
    pub source_urls: Vec<String>,
    /// Credibility carried over from the scored item.
    #[serde(default)]
    pub credibility: f64,
}

/// The social draft produced by the drafting stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPost {
    /// Draft text.
    pub body: String,
    /// Which revision cycle produced this draft (0 = initial).
    pub revision: u32,
}

impl DraftPost {
    /// Character count of the draft body.
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.chars().count()
    }

    /// True if the draft body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Descriptor for one visual asset. Rendering is an external concern; the
/// pipeline only decides what goes on the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Headline placed on the card.
    pub headline: String,
    /// Topic label placed on the card.
    pub topic: Topic,
    /// Card width in pixels.
    pub width: u32,
    /// Card height in pixels.
    pub height: u32,
    /// Template identifier for the renderer.
    pub template: String,
}

/// Record of a completed publish stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    /// Channels the content was handed to.
    pub channels: Vec<String>,
    /// When the publish stage committed.
    pub published_at: DateTime<Utc>,
}

/// The reviewer decision fed back into a suspended run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// What the reviewer chose.
    pub intent: DecisionIntent,
    /// Free-form feedback, present on revise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// When the decision was verified.
    pub decided_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_parse_lenient() {
        assert_eq!(Topic::parse_lenient("LLM"), Topic::Llm);
        assert_eq!(Topic::parse_lenient(" Computer Vision "), Topic::Vision);
        assert_eq!(Topic::parse_lenient("quantum sandwiches"), Topic::Other);
    }

    #[test]
    fn test_topic_serialize() {
        let json = serde_json::to_string(&Topic::Policy).unwrap();
        assert_eq!(json, r#""policy""#);
    }

    #[test]
    fn test_draft_post_len_counts_chars() {
        let draft = DraftPost {
            body: "héllo".to_string(),
            revision: 0,
        };
        assert_eq!(draft.len(), 5);
        assert!(!draft.is_empty());
    }

    #[test]
    fn test_summary_round_trip() {
        let summary = Summary {
            headline: "Model released".to_string(),
            body: "A new model exists.".to_string(),
            topic: Topic::Llm,
            source_urls: vec!["https://example.com/a".to_string()],
            credibility: 0.8,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: Summary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary, back);
    }
}
