//! Deduplication and ranking of fan-out output.
//!
//! Two items are the same story when their normalized titles are similar
//! enough and their canonical ids agree, or when their URLs normalize
//! identically. Groups are the transitive closure of that relation, so a
//! chain A~B~C collapses into one group even when A and C are not pairwise
//! similar.

mod score;

pub use score::{score_group, ReputationTable};

use crate::config::DedupConfig;
use crate::core::{normalize_title, normalize_url, CandidateItem, ScoredItem};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

/// The same-story relation for a pair of items.
#[must_use]
pub fn same_story(a: &CandidateItem, b: &CandidateItem, similarity_threshold: f64) -> bool {
    if normalize_url(&a.url) == normalize_url(&b.url) {
        return true;
    }
    if a.canonical_id != b.canonical_id {
        return false;
    }
    let similarity = normalized_levenshtein(&normalize_title(&a.title), &normalize_title(&b.title));
    similarity >= similarity_threshold
}

/// Union-find over item indices, path-halving.
struct DuplicateGroups {
    parent: Vec<usize>,
}

impl DuplicateGroups {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Deduplicates and ranks items as of now.
#[must_use]
pub fn rank(items: &[CandidateItem], config: &DedupConfig) -> Vec<ScoredItem> {
    rank_at(items, config, Utc::now())
}

/// Deduplicates, scores, and sorts items with an explicit clock.
///
/// Output is sorted by descending score; ties break on the most recent
/// publication timestamp, then on the lexicographically smallest canonical
/// id, so the ordering is independent of input order.
#[must_use]
pub fn rank_at(
    items: &[CandidateItem],
    config: &DedupConfig,
    now: DateTime<Utc>,
) -> Vec<ScoredItem> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut groups = DuplicateGroups::new(items.len());
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if same_story(&items[i], &items[j], config.similarity_threshold) {
                groups.union(i, j);
            }
        }
    }

    let mut by_root: std::collections::HashMap<usize, Vec<usize>> =
        std::collections::HashMap::new();
    for i in 0..items.len() {
        by_root.entry(groups.find(i)).or_default().push(i);
    }

    let mut scored: Vec<ScoredItem> = by_root
        .into_values()
        .map(|members| collapse_group(items, &members, config, now))
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.item.published_at.cmp(&a.item.published_at))
            .then_with(|| a.item.canonical_id.cmp(&b.item.canonical_id))
    });
    scored
}

/// Collapses one duplicate group onto its representative.
///
/// The representative is the member with the longest body, ties broken by
/// earliest publication, then smallest canonical id. Provenance is the
/// union of all members' sources.
fn collapse_group(
    items: &[CandidateItem],
    member_indices: &[usize],
    config: &DedupConfig,
    now: DateTime<Utc>,
) -> ScoredItem {
    let members: Vec<&CandidateItem> = member_indices.iter().map(|&i| &items[i]).collect();

    let representative = members
        .iter()
        .copied()
        .min_by(|a, b| {
            b.body
                .len()
                .cmp(&a.body.len())
                .then_with(|| a.published_at.cmp(&b.published_at))
                .then_with(|| a.canonical_id.cmp(&b.canonical_id))
        })
        .unwrap_or(&items[member_indices[0]]);

    let sources: BTreeSet<String> = members.iter().map(|m| m.source.clone()).collect();
    let score = score_group(&members, representative, sources.len(), config, now);

    ScoredItem {
        item: representative.clone(),
        score,
        sources,
    }
}
