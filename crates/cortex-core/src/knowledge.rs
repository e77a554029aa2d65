//! Knowledge base domain logic and abstractions.
//!
//! A flat, indexed store of `KnowledgeEntry` records. Indexing strategy and
//! storage live behind `KnowledgeRepository`, implemented in `cortex-infra`.

use chrono::{DateTime, Utc};
use cortex_types::{clamp01, Id};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of knowledge a `KnowledgeEntry` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeKind {
    Fact,
    Rule,
    Pattern,
    Concept,
    Skill,
    Strategy,
    Meta,
}

/// Structured content carried by a knowledge entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeContent {
    pub representation: String,
    pub meaning: String,
    pub domain: String,
    pub relationships: Vec<String>,
}

/// Time- and condition-bounded validity window for a knowledge entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validity {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub conditions: HashMap<String, String>,
}

impl Validity {
    pub fn open_ended(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: None,
            conditions: HashMap::new(),
        }
    }

    pub fn is_active_at(&self, when: DateTime<Utc>) -> bool {
        when >= self.start && self.end.map(|e| when <= e).unwrap_or(true)
    }
}

/// A single knowledge entry.
///
/// Invariant: `confidence` is monotonic-nondecreasing, rising by at most
/// `+0.01` per related-insight update, clamped at `1.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: Id,
    pub kind: KnowledgeKind,
    pub content: KnowledgeContent,
    pub confidence: f64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub validity: Validity,
}

/// Maximum confidence delta applied by a single related-insight update.
pub const MAX_CONFIDENCE_DELTA: f64 = 0.01;

impl KnowledgeEntry {
    pub fn new(kind: KnowledgeKind, content: KnowledgeContent, confidence: f64, source: String) -> Self {
        let now = Utc::now();
        Self {
            id: cortex_types::new_id(),
            kind,
            content,
            confidence: clamp01(confidence),
            source,
            timestamp: now,
            validity: Validity::open_ended(now),
        }
    }

    /// Apply a bounded confidence reinforcement, never exceeding `+0.01` and
    /// never exceeding `1.0` total.
    pub fn reinforce(&mut self, delta: f64) {
        let bounded = delta.max(0.0).min(MAX_CONFIDENCE_DELTA);
        self.confidence = clamp01(self.confidence + bounded);
    }

    /// Derived quality score (confidence weighted by recency of use),
    /// used by the confidence-bucket secondary index.
    pub fn quality_score(&self, now: DateTime<Utc>) -> f64 {
        let days = (now - self.timestamp).num_days().max(0) as f64;
        let recency = (1.0 - days / 30.0).max(0.0).min(1.0);
        clamp01(0.7 * self.confidence + 0.3 * recency)
    }

    /// Whether this entry is "related to" an insight pattern: same kind, or
    /// a substring match between the entry's meaning and the pattern text.
    pub fn related_to(&self, kind: Option<KnowledgeKind>, pattern_text: &str) -> bool {
        if let Some(k) = kind {
            if k == self.kind {
                return true;
            }
        }
        let needle = pattern_text.to_lowercase();
        !needle.is_empty() && self.content.meaning.to_lowercase().contains(&needle)
    }
}

/// Confidence bucket used for the confidence secondary index: tenths,
/// `0` through `10`.
pub fn confidence_bucket(confidence: f64) -> u8 {
    (clamp01(confidence) * 10.0).round() as u8
}

/// Day bucket (days since the Unix epoch) used for the temporal secondary
/// index.
pub fn day_bucket(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp() / 86_400
}

/// Coarse token set of a meaning string, used for the meaning secondary
/// index: lowercased, split on non-alphanumerics, short stop-tokens dropped.
pub fn meaning_tokens(meaning: &str) -> Vec<String> {
    meaning
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| tok.len() > 2)
        .map(String::from)
        .collect()
}

/// A predicate filter for `retrieve`.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeQuery {
    pub kind: Option<KnowledgeKind>,
    pub min_confidence: Option<f64>,
    pub source: Option<String>,
}

impl KnowledgeQuery {
    pub fn matches(&self, entry: &KnowledgeEntry) -> bool {
        if let Some(kind) = self.kind {
            if entry.kind != kind {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if entry.confidence < min {
                return false;
            }
        }
        if let Some(ref source) = self.source {
            if &entry.source != source {
                return false;
            }
        }
        true
    }
}

/// An insight produced by the learning engine, as seen by the knowledge
/// base's `integrate_learning` operation.
#[derive(Debug, Clone)]
pub struct IncomingInsight {
    pub kind: KnowledgeKind,
    pub content: KnowledgeContent,
    pub confidence: f64,
    pub source: String,
    pub pattern_text: String,
}

/// Outcome of integrating one batch of insights into the knowledge base.
#[derive(Debug, Clone, Default)]
pub struct IntegrationResult {
    pub stored_ids: Vec<Id>,
    pub reinforced_ids: Vec<Id>,
}

/// Async repository contract for the knowledge base, implemented by
/// `cortex_infra::knowledge::InMemoryKnowledgeBase`.
#[async_trait::async_trait]
pub trait KnowledgeRepository: Send + Sync {
    async fn store(&self, entry: KnowledgeEntry) -> cortex_types::Result<Id>;
    async fn get(&self, id: Id) -> cortex_types::Result<Option<KnowledgeEntry>>;
    async fn retrieve(&self, query: &KnowledgeQuery) -> cortex_types::Result<Vec<KnowledgeEntry>>;
    async fn integrate_learning(&self, insights: Vec<IncomingInsight>) -> cortex_types::Result<IntegrationResult>;
    async fn clear(&self) -> cortex_types::Result<()>;
    async fn len(&self) -> cortex_types::Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(meaning: &str) -> KnowledgeContent {
        KnowledgeContent {
            representation: "text".into(),
            meaning: meaning.into(),
            domain: "test".into(),
            relationships: vec![],
        }
    }

    #[test]
    fn reinforce_clamps_delta_and_ceiling() {
        let mut entry = KnowledgeEntry::new(KnowledgeKind::Fact, content("a"), 0.999, "src".into());
        entry.reinforce(0.5);
        assert!(entry.confidence <= 1.0);
        assert!(entry.confidence - 0.999 <= MAX_CONFIDENCE_DELTA + 1e-9);
    }

    #[test]
    fn confidence_bucket_bounds() {
        assert_eq!(confidence_bucket(0.0), 0);
        assert_eq!(confidence_bucket(1.0), 10);
    }

    #[test]
    fn related_to_matches_by_kind_or_substring() {
        let entry = KnowledgeEntry::new(KnowledgeKind::Rule, content("birds can fly"), 0.5, "src".into());
        assert!(entry.related_to(Some(KnowledgeKind::Rule), "unrelated"));
        assert!(entry.related_to(None, "can fly"));
        assert!(!entry.related_to(Some(KnowledgeKind::Fact), "unrelated"));
    }

    #[test]
    fn meaning_tokens_drops_short_tokens() {
        let tokens = meaning_tokens("a cat is on the mat!");
        assert!(tokens.contains(&"cat".to_string()));
        assert!(!tokens.contains(&"is".to_string()));
    }
}
