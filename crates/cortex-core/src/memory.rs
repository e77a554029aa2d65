//! Memory domain logic and abstractions.
//!
//! This module defines the tiered memory model and the pure scoring
//! functions (eviction, retrieval, similarity, decay) without any I/O.
//! Concrete storage lives behind the `MemoryRepository` trait, implemented
//! in `cortex-infra`.

use chrono::{DateTime, Utc};
use cortex_types::{clamp01, seconds_between, Id};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The five memory classes a `MemoryEntry` can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Short,
    Working,
    Long,
    Episodic,
    Semantic,
}

impl Tier {
    /// Bounded tiers have a hard capacity; unbounded tiers rely on
    /// optimization passes instead.
    pub fn capacity(&self, config: &cortex_types::MemoryConfig) -> Option<usize> {
        match self {
            Tier::Short => Some(config.capacity_short),
            Tier::Working => Some(config.capacity_working),
            Tier::Long | Tier::Episodic | Tier::Semantic => None,
        }
    }

    /// Tier-dependent multiple of `base_decay_rate`.
    pub fn decay_multiplier(&self) -> f64 {
        match self {
            Tier::Short => 2.0,
            Tier::Working => 1.5,
            Tier::Long => 0.5,
            Tier::Episodic => 0.8,
            Tier::Semantic => 0.3,
        }
    }

    pub fn decay_rate(&self, base: f64) -> f64 {
        self.decay_multiplier() * base
    }
}

/// A single memory record. `content` is opaque to the manager except for the
/// similarity computations used by consolidation and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Id,
    pub tier: Tier,
    pub content: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
    pub importance: f64,
    pub decay_rate: f64,
    pub associations: Vec<String>,
}

impl MemoryEntry {
    pub fn new(tier: Tier, content: serde_json::Value, importance: f64, decay_rate: f64, associations: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: cortex_types::new_id(),
            tier,
            content,
            timestamp: now,
            last_accessed: now,
            access_count: 0,
            importance: clamp01(importance),
            decay_rate,
            associations,
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
        self.access_count += 1;
    }

    /// Eviction score: lower means evict first.
    /// `importance * (1 - decay_rate * seconds_since_access)`, where the
    /// decay term is clamped at zero so a very stale entry cannot produce a
    /// negative score ordering surprise.
    pub fn eviction_score(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = seconds_between(self.last_accessed, now);
        let decay_term = (1.0 - self.decay_rate * elapsed).max(0.0);
        self.importance * decay_term
    }
}

/// Memory statistics snapshot, safe to read without holding the store lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_items: usize,
    pub size_bytes: usize,
    pub last_access: DateTime<Utc>,
    pub access_count: u64,
    pub consolidation_count: u64,
}

/// A filter over a tier's entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    pub keywords: Vec<String>,
    pub associations: Vec<String>,
    pub tier: Option<Tier>,
    pub limit: Option<usize>,
}

/// Result of a `retrieve` call: entries paired with their relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEntry {
    pub entry: MemoryEntry,
    pub score: f64,
}

/// Outcome of a consolidation pass: one short-tier group merged into a
/// single long-tier entry. `strength` is the mean pairwise similarity across
/// the group; `themes`, `temporal_pattern`, and `content_pattern` are the
/// three artifacts the consolidation protocol extracts from the source set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consolidation {
    pub merged_entry_id: Id,
    pub source_ids: Vec<Id>,
    pub strength: f64,
    pub themes: Vec<String>,
    pub temporal_pattern: String,
    pub content_pattern: String,
}

/// Describe the temporal spread of a consolidated group: the span between
/// its earliest and latest source timestamp.
pub fn temporal_pattern(timestamps: &[DateTime<Utc>]) -> String {
    if timestamps.len() < 2 {
        return "single timestamp".to_string();
    }
    let min = timestamps.iter().min().unwrap();
    let max = timestamps.iter().max().unwrap();
    let span_hours = (*max - *min).num_minutes() as f64 / 60.0;
    format!("clustered within {:.2}h", span_hours)
}

/// Describe the content structure shared across a consolidated group: the
/// top-level object keys present in every source entry.
pub fn content_pattern(contents: &[serde_json::Value]) -> String {
    let mut shared: Option<std::collections::HashSet<String>> = None;
    for content in contents {
        let keys: std::collections::HashSet<String> =
            content.as_object().map(|o| o.keys().cloned().collect()).unwrap_or_default();
        shared = Some(match shared {
            Some(existing) => existing.intersection(&keys).cloned().collect(),
            None => keys,
        });
    }
    let mut keys: Vec<String> = shared.unwrap_or_default().into_iter().collect();
    keys.sort();
    if keys.is_empty() {
        "no shared keys".to_string()
    } else {
        format!("shared keys: {}", keys.join(", "))
    }
}

/// One optimization action taken during an `optimize()` pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Optimization {
    Pruned { id: Id },
    Reorganized { id: Id, added_associations: Vec<String> },
    Compressed { source_ids: Vec<Id>, summary_id: Id },
}

/// Relevance scoring for a single candidate against a query, per the
/// documented weights: keyword 0.4, association 0.3, recency 0.2, importance
/// 0.1, clamped to `[0,1]`. `recency` is precomputed by the caller as a value
/// in `[0,1]` (1.0 = just accessed).
pub fn retrieval_score(keyword_overlap: f64, association_overlap: f64, recency: f64, importance: f64) -> f64 {
    clamp01(0.4 * keyword_overlap + 0.3 * association_overlap + 0.2 * recency + 0.1 * importance)
}

pub const RETRIEVAL_MIN_SCORE: f64 = 0.1;
pub const RETRIEVAL_MAX_RESULTS: usize = 20;

/// Pairwise similarity used for consolidation grouping: content 0.5,
/// association overlap 0.3, temporal proximity 0.2 (decaying over 24h).
pub fn consolidation_similarity(content_sim: f64, association_sim: f64, hours_apart: f64) -> f64 {
    let temporal = (1.0 - (hours_apart / 24.0)).max(0.0).min(1.0);
    clamp01(0.5 * content_sim + 0.3 * association_sim + 0.2 * temporal)
}

/// Shallow Jaccard-style overlap between two association sets.
pub fn association_overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let set_a: std::collections::HashSet<&String> = a.iter().collect();
    let set_b: std::collections::HashSet<&String> = b.iter().collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Coarse content similarity: fraction of shared top-level object keys with
/// equal values, falling back to exact-match for non-object content.
pub fn content_similarity(a: &serde_json::Value, b: &serde_json::Value) -> f64 {
    match (a.as_object(), b.as_object()) {
        (Some(oa), Some(ob)) => {
            if oa.is_empty() && ob.is_empty() {
                return 1.0;
            }
            let keys: std::collections::HashSet<&String> = oa.keys().chain(ob.keys()).collect();
            if keys.is_empty() {
                return 1.0;
            }
            let matches = keys
                .iter()
                .filter(|k| oa.get(k.as_str()) == ob.get(k.as_str()) && oa.get(k.as_str()).is_some())
                .count();
            matches as f64 / keys.len() as f64
        }
        _ => {
            if a == b {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Merge two JSON objects shallowly; on key collision the second value wins.
/// Non-object content falls back to wrapping both under `a`/`b` keys.
pub fn merge_content(a: &serde_json::Value, b: &serde_json::Value) -> serde_json::Value {
    match (a.as_object(), b.as_object()) {
        (Some(oa), Some(ob)) => {
            let mut merged = oa.clone();
            for (k, v) in ob {
                merged.insert(k.clone(), v.clone());
            }
            serde_json::Value::Object(merged)
        }
        _ => {
            let mut merged = serde_json::Map::new();
            merged.insert("a".to_string(), a.clone());
            merged.insert("b".to_string(), b.clone());
            serde_json::Value::Object(merged)
        }
    }
}

/// Union two association lists, preserving first-occurrence order.
pub fn union_associations(a: &[String], b: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    for tag in a.iter().chain(b.iter()) {
        if !out.contains(tag) {
            out.push(tag.clone());
        }
    }
    out
}

/// Consolidation's `importance * 1.2` clamp rule, applied to the average of
/// the source importances.
pub fn consolidated_importance(source_importances: &[f64]) -> f64 {
    if source_importances.is_empty() {
        return 0.0;
    }
    let avg = source_importances.iter().sum::<f64>() / source_importances.len() as f64;
    clamp01(avg * 1.2)
}

/// Async repository contract spanning all five tiers, implemented by
/// `cortex_infra::memory::InMemoryMemoryManager`.
#[async_trait::async_trait]
pub trait MemoryRepository: Send + Sync {
    async fn store(&self, entry: MemoryEntry) -> cortex_types::Result<Id>;
    async fn retrieve(&self, query: &MemoryQuery) -> cortex_types::Result<Vec<ScoredEntry>>;
    async fn get(&self, id: Id) -> cortex_types::Result<Option<MemoryEntry>>;
    async fn consolidate(&self) -> cortex_types::Result<Vec<Consolidation>>;
    async fn optimize(&self) -> cortex_types::Result<Vec<Optimization>>;
    async fn clear(&self, tier: Option<Tier>) -> cortex_types::Result<()>;
    async fn stats(&self, tier: Option<Tier>) -> cortex_types::Result<MemoryStats>;
}

/// Simple keyword-overlap helper: fraction of query keywords found as
/// case-insensitive substrings of the serialized content.
pub fn keyword_overlap(keywords: &[String], content: &serde_json::Value) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let haystack = content.to_string().to_lowercase();
    let hits = keywords
        .iter()
        .filter(|kw| haystack.contains(&kw.to_lowercase()))
        .count();
    hits as f64 / keywords.len() as f64
}

/// Recency score in `[0,1]`: 1.0 at zero elapsed time, decaying linearly to
/// 0 over 24 hours, matching the consolidation temporal-proximity horizon.
pub fn recency_score(last_accessed: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = seconds_between(last_accessed, now) / 3600.0;
    (1.0 - hours / 24.0).max(0.0).min(1.0)
}

pub type ContextMap = HashMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_score_prefers_stale_low_importance() {
        let now = Utc::now();
        let mut stale = MemoryEntry::new(Tier::Short, serde_json::json!({}), 0.1, 0.2, vec![]);
        stale.last_accessed = now - chrono::Duration::hours(1);
        let mut fresh = MemoryEntry::new(Tier::Short, serde_json::json!({}), 0.9, 0.2, vec![]);
        fresh.last_accessed = now;
        assert!(stale.eviction_score(now) < fresh.eviction_score(now));
    }

    #[test]
    fn consolidated_importance_matches_worked_example() {
        let merged = consolidated_importance(&[0.6, 0.6]);
        assert!((merged - 0.72).abs() < 1e-9);
    }

    #[test]
    fn merge_content_shallow_union() {
        let a = serde_json::json!({"a": 1});
        let b = serde_json::json!({"b": 2});
        let merged = merge_content(&a, &b);
        assert_eq!(merged, serde_json::json!({"a": 1, "b": 2}));
    }

    #[test]
    fn union_associations_preserves_order_and_dedups() {
        let a = vec!["t1".to_string(), "t2".to_string()];
        let b = vec!["t2".to_string(), "t3".to_string()];
        assert_eq!(union_associations(&a, &b), vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn retrieval_score_clamped() {
        assert!((retrieval_score(1.0, 1.0, 1.0, 1.0) - 1.0).abs() < 1e-9);
        assert_eq!(retrieval_score(0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn temporal_pattern_reports_span() {
        let now = Utc::now();
        let timestamps = [now, now + chrono::Duration::hours(2)];
        assert_eq!(temporal_pattern(&timestamps), "clustered within 2.00h");
        assert_eq!(temporal_pattern(&[now]), "single timestamp");
    }

    #[test]
    fn content_pattern_finds_shared_keys() {
        let contents = vec![serde_json::json!({"a": 1, "b": 2}), serde_json::json!({"a": 3, "c": 4})];
        assert_eq!(content_pattern(&contents), "shared keys: a");
        assert_eq!(content_pattern(&[serde_json::json!({"x": 1})]), "shared keys: x");
    }
}
