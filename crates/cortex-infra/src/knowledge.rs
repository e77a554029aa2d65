//! In-memory knowledge base with secondary indexes by kind, meaning token,
//! day bucket, and confidence bucket.

use chrono::Utc;
use cortex_core::knowledge::{
    confidence_bucket, day_bucket, meaning_tokens, IncomingInsight, IntegrationResult, KnowledgeEntry, KnowledgeKind,
    KnowledgeQuery, KnowledgeRepository, MAX_CONFIDENCE_DELTA,
};
use cortex_types::{Id, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Indexes {
    by_kind: HashMap<KnowledgeKind, HashSet<Id>>,
    by_token: HashMap<String, HashSet<Id>>,
    by_day: HashMap<i64, HashSet<Id>>,
    by_confidence_bucket: HashMap<u8, HashSet<Id>>,
}

impl Indexes {
    fn insert(&mut self, entry: &KnowledgeEntry) {
        self.by_kind.entry(entry.kind).or_default().insert(entry.id);
        for token in meaning_tokens(&entry.content.meaning) {
            self.by_token.entry(token).or_default().insert(entry.id);
        }
        self.by_day.entry(day_bucket(entry.timestamp)).or_default().insert(entry.id);
        self.by_confidence_bucket.entry(confidence_bucket(entry.confidence)).or_default().insert(entry.id);
    }

    fn remove(&mut self, entry: &KnowledgeEntry) {
        if let Some(set) = self.by_kind.get_mut(&entry.kind) {
            set.remove(&entry.id);
        }
        for token in meaning_tokens(&entry.content.meaning) {
            if let Some(set) = self.by_token.get_mut(&token) {
                set.remove(&entry.id);
            }
        }
        if let Some(set) = self.by_day.get_mut(&day_bucket(entry.timestamp)) {
            set.remove(&entry.id);
        }
        if let Some(set) = self.by_confidence_bucket.get_mut(&confidence_bucket(entry.confidence)) {
            set.remove(&entry.id);
        }
    }
}

pub struct InMemoryKnowledgeBase {
    entries: Arc<RwLock<HashMap<Id, KnowledgeEntry>>>,
    indexes: Arc<RwLock<Indexes>>,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            indexes: Arc::new(RwLock::new(Indexes::default())),
        }
    }
}

impl Default for InMemoryKnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl KnowledgeRepository for InMemoryKnowledgeBase {
    async fn store(&self, entry: KnowledgeEntry) -> Result<Id> {
        let id = entry.id;
        let mut entries = self.entries.write().await;
        let mut indexes = self.indexes.write().await;
        if let Some(old) = entries.remove(&id) {
            indexes.remove(&old);
        }
        indexes.insert(&entry);
        entries.insert(id, entry);
        debug!(id = %id, "stored knowledge entry");
        Ok(id)
    }

    async fn get(&self, id: Id) -> Result<Option<KnowledgeEntry>> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn retrieve(&self, query: &KnowledgeQuery) -> Result<Vec<KnowledgeEntry>> {
        let entries = self.entries.read().await;
        let mut results: Vec<KnowledgeEntry> = entries.values().filter(|e| query.matches(e)).cloned().collect();
        results.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    async fn integrate_learning(&self, insights: Vec<IncomingInsight>) -> Result<IntegrationResult> {
        let mut entries = self.entries.write().await;
        let mut indexes = self.indexes.write().await;
        let mut result = IntegrationResult::default();

        for insight in insights {
            let new_entry = KnowledgeEntry::new(insight.kind, insight.content.clone(), insight.confidence, insight.source.clone());
            let new_id = new_entry.id;

            let related_ids: Vec<Id> = entries
                .values()
                .filter(|existing| existing.related_to(Some(insight.kind), &insight.pattern_text))
                .map(|e| e.id)
                .collect();

            for id in related_ids {
                if let Some(existing) = entries.get_mut(&id) {
                    indexes.remove(existing);
                    existing.reinforce(MAX_CONFIDENCE_DELTA);
                    indexes.insert(existing);
                    result.reinforced_ids.push(id);
                }
            }

            indexes.insert(&new_entry);
            entries.insert(new_id, new_entry);
            result.stored_ids.push(new_id);
        }

        Ok(result)
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        *self.indexes.write().await = Indexes::default();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

/// Lookup helpers exposing the secondary indexes directly, for callers that
/// want index-backed access rather than a full predicate scan.
impl InMemoryKnowledgeBase {
    pub async fn by_kind(&self, kind: KnowledgeKind) -> Vec<Id> {
        self.indexes.read().await.by_kind.get(&kind).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    pub async fn by_day(&self, day: i64) -> Vec<Id> {
        self.indexes.read().await.by_day.get(&day).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    pub async fn by_token(&self, token: &str) -> Vec<Id> {
        self.indexes.read().await.by_token.get(token).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::knowledge::KnowledgeContent;

    fn content(meaning: &str) -> KnowledgeContent {
        KnowledgeContent { representation: "text".into(), meaning: meaning.into(), domain: "d".into(), relationships: vec![] }
    }

    #[tokio::test]
    async fn store_then_retrieve_roundtrip() {
        let kb = InMemoryKnowledgeBase::new();
        let entry = KnowledgeEntry::new(KnowledgeKind::Fact, content("cats purr"), 0.5, "src".into());
        let id = entry.id;
        kb.store(entry).await.unwrap();
        let fetched = kb.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
    }

    #[tokio::test]
    async fn replacing_same_id_keeps_single_entry() {
        let kb = InMemoryKnowledgeBase::new();
        let mut entry = KnowledgeEntry::new(KnowledgeKind::Fact, content("a"), 0.5, "src".into());
        let id = entry.id;
        kb.store(entry.clone()).await.unwrap();
        entry.confidence = 0.9;
        kb.store(entry).await.unwrap();
        assert_eq!(kb.len().await.unwrap(), 1);
        assert_eq!(kb.get(id).await.unwrap().unwrap().confidence, 0.9);
    }

    #[tokio::test]
    async fn integrate_learning_reinforces_related_entries() {
        let kb = InMemoryKnowledgeBase::new();
        let existing = KnowledgeEntry::new(KnowledgeKind::Rule, content("birds can fly"), 0.5, "src".into());
        kb.store(existing.clone()).await.unwrap();

        let insight = IncomingInsight {
            kind: KnowledgeKind::Rule,
            content: content("sparrows can fly"),
            confidence: 0.6,
            source: "learning".into(),
            pattern_text: "can fly".into(),
        };
        let result = kb.integrate_learning(vec![insight]).await.unwrap();
        assert_eq!(result.stored_ids.len(), 1);
        assert!(result.reinforced_ids.contains(&existing.id));
        let updated = kb.get(existing.id).await.unwrap().unwrap();
        assert!(updated.confidence > 0.5);
    }
}
