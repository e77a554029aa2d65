//! In-memory implementation of the tiered memory manager.

use chrono::Utc;
use cortex_core::memory::{
    association_overlap, consolidated_importance, consolidation_similarity, content_pattern, keyword_overlap,
    merge_content, recency_score, retrieval_score, temporal_pattern, union_associations, Consolidation, MemoryEntry,
    MemoryQuery, MemoryRepository, MemoryStats, Optimization, ScoredEntry, Tier, RETRIEVAL_MAX_RESULTS,
    RETRIEVAL_MIN_SCORE,
};
use cortex_types::{Id, MemoryConfig, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Reserved content key used to record the originating ids of a merged or
/// compressed entry.
const SOURCE_IDS_KEY: &str = "_source_ids";

pub struct InMemoryMemoryManager {
    entries: Arc<RwLock<HashMap<Id, MemoryEntry>>>,
    config: MemoryConfig,
    access_count: Arc<RwLock<u64>>,
    consolidation_count: Arc<RwLock<u64>>,
}

impl InMemoryMemoryManager {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            config,
            access_count: Arc::new(RwLock::new(0)),
            consolidation_count: Arc::new(RwLock::new(0)),
        }
    }

    async fn evict_if_needed(&self, entries: &mut HashMap<Id, MemoryEntry>, tier: Tier) -> Option<Id> {
        let capacity = tier.capacity(&self.config)?;
        let count = entries.values().filter(|e| e.tier == tier).count();
        if count < capacity {
            return None;
        }
        let now = Utc::now();
        let victim = entries
            .values()
            .filter(|e| e.tier == tier)
            .min_by(|a, b| a.eviction_score(now).partial_cmp(&b.eviction_score(now)).unwrap())
            .map(|e| e.id);
        if let Some(id) = victim {
            entries.remove(&id);
            debug!(tier = ?tier, evicted = %id, "evicted entry to respect tier capacity");
        }
        victim
    }

    /// Greedy grouping of `candidates` by pairwise similarity against
    /// `threshold`: seed each unvisited entry and absorb any remaining entry
    /// similar enough to it into the same group. `strict` selects the
    /// boundary operator: consolidation groups at `sim >= threshold` while
    /// compression groups at `sim > threshold`, per the two passes'
    /// different thresholds in the specification.
    fn group_by_similarity(candidates: &[&MemoryEntry], threshold: f64, strict: bool) -> Vec<(Vec<Id>, f64)> {
        let mut visited = vec![false; candidates.len()];
        let mut groups = Vec::new();
        for i in 0..candidates.len() {
            if visited[i] {
                continue;
            }
            let mut group = vec![i];
            visited[i] = true;
            let mut sims = Vec::new();
            for j in (i + 1)..candidates.len() {
                if visited[j] {
                    continue;
                }
                let hours_apart = (candidates[j].timestamp - candidates[i].timestamp)
                    .num_minutes()
                    .unsigned_abs() as f64
                    / 60.0;
                let sim = consolidation_similarity(
                    cortex_core::memory::content_similarity(&candidates[i].content, &candidates[j].content),
                    association_overlap(&candidates[i].associations, &candidates[j].associations),
                    hours_apart,
                );
                let passes = if strict { sim > threshold } else { sim >= threshold };
                if passes {
                    group.push(j);
                    visited[j] = true;
                    sims.push(sim);
                }
            }
            if group.len() >= 2 {
                let strength = sims.iter().sum::<f64>() / sims.len() as f64;
                groups.push((group.into_iter().map(|idx| candidates[idx].id).collect(), strength));
            }
        }
        groups
    }
}

#[async_trait::async_trait]
impl MemoryRepository for InMemoryMemoryManager {
    #[instrument(skip(self, entry), fields(tier = ?entry.tier))]
    async fn store(&self, mut entry: MemoryEntry) -> Result<Id> {
        entry.decay_rate = entry.tier.decay_rate(self.config.base_decay_rate);
        let mut entries = self.entries.write().await;
        self.evict_if_needed(&mut entries, entry.tier).await;
        let id = entry.id;
        entries.insert(id, entry);
        Ok(id)
    }

    async fn retrieve(&self, query: &MemoryQuery) -> Result<Vec<ScoredEntry>> {
        let entries = self.entries.read().await;
        let now = Utc::now();
        let mut scored: Vec<ScoredEntry> = entries
            .values()
            .filter(|e| query.tier.map(|t| t == e.tier).unwrap_or(true))
            .map(|e| {
                let score = retrieval_score(
                    keyword_overlap(&query.keywords, &e.content),
                    association_overlap(&query.associations, &e.associations),
                    recency_score(e.last_accessed, now),
                    e.importance,
                );
                ScoredEntry { entry: e.clone(), score }
            })
            .filter(|s| s.score >= RETRIEVAL_MIN_SCORE)
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.limit.unwrap_or(RETRIEVAL_MAX_RESULTS).min(RETRIEVAL_MAX_RESULTS));
        *self.access_count.write().await += 1;
        Ok(scored)
    }

    async fn get(&self, id: Id) -> Result<Option<MemoryEntry>> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(&id) {
            entry.touch();
            return Ok(Some(entry.clone()));
        }
        Ok(None)
    }

    #[instrument(skip(self))]
    async fn consolidate(&self) -> Result<Vec<Consolidation>> {
        let mut entries = self.entries.write().await;
        let short: Vec<&MemoryEntry> = entries.values().filter(|e| e.tier == Tier::Short).collect();
        let groups = Self::group_by_similarity(&short, self.config.consolidation_similarity_threshold, false);

        let mut results = Vec::new();
        for (source_ids, strength) in groups {
            let sources: Vec<MemoryEntry> = source_ids
                .iter()
                .filter_map(|id| entries.get(id).cloned())
                .collect();
            if sources.len() < 2 {
                continue;
            }
            let merged_content = sources
                .iter()
                .skip(1)
                .fold(sources[0].content.clone(), |acc, e| merge_content(&acc, &e.content));
            let merged_associations = sources
                .iter()
                .skip(1)
                .fold(sources[0].associations.clone(), |acc, e| union_associations(&acc, &e.associations));
            let importance = consolidated_importance(&sources.iter().map(|e| e.importance).collect::<Vec<_>>());
            let access_count: u64 = sources.iter().map(|e| e.access_count).sum();

            let mut merged_content = merged_content;
            if let Some(obj) = merged_content.as_object_mut() {
                obj.insert(
                    SOURCE_IDS_KEY.to_string(),
                    serde_json::Value::Array(source_ids.iter().map(|id| serde_json::json!(id.to_string())).collect()),
                );
            }

            let mut merged = MemoryEntry::new(Tier::Long, merged_content, importance, Tier::Long.decay_rate(self.config.base_decay_rate), merged_associations.clone());
            merged.access_count = access_count;

            let temporal = temporal_pattern(&sources.iter().map(|e| e.timestamp).collect::<Vec<_>>());
            let content = content_pattern(&sources.iter().map(|e| e.content.clone()).collect::<Vec<_>>());

            let merged_id = merged.id;
            for id in &source_ids {
                entries.remove(id);
            }
            entries.insert(merged_id, merged);

            *self.consolidation_count.write().await += 1;
            results.push(Consolidation {
                merged_entry_id: merged_id,
                source_ids,
                strength,
                themes: merged_associations,
                temporal_pattern: temporal,
                content_pattern: content,
            });
        }
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn optimize(&self) -> Result<Vec<Optimization>> {
        let mut entries = self.entries.write().await;
        let mut actions = Vec::new();
        let now = Utc::now();

        // Pruning: short entries with low importance left idle over an hour.
        let to_prune: Vec<Id> = entries
            .values()
            .filter(|e| {
                e.tier == Tier::Short && e.importance < 0.2 && cortex_types::seconds_between(e.last_accessed, now) > 3600.0
            })
            .map(|e| e.id)
            .collect();
        for id in to_prune {
            entries.remove(&id);
            actions.push(Optimization::Pruned { id });
        }

        // Reorganization: long-tier entries sharing an association get the
        // group's majority associations merged in.
        let long_ids: Vec<Id> = entries.values().filter(|e| e.tier == Tier::Long).map(|e| e.id).collect();
        let mut tag_members: HashMap<String, Vec<Id>> = HashMap::new();
        for id in &long_ids {
            if let Some(entry) = entries.get(id) {
                for tag in &entry.associations {
                    tag_members.entry(tag.clone()).or_default().push(*id);
                }
            }
        }
        let mut visited = std::collections::HashSet::new();
        for id in &long_ids {
            if visited.contains(id) {
                continue;
            }
            let group: std::collections::HashSet<Id> = entries
                .get(id)
                .map(|e| e.associations.iter().flat_map(|t| tag_members.get(t).cloned().unwrap_or_default()))
                .into_iter()
                .flatten()
                .collect();
            if group.len() < 2 {
                continue;
            }
            let mut tag_freq: HashMap<String, usize> = HashMap::new();
            for member in &group {
                if let Some(entry) = entries.get(member) {
                    for tag in &entry.associations {
                        *tag_freq.entry(tag.clone()).or_insert(0) += 1;
                    }
                }
            }
            let threshold = group.len() / 2;
            let common: Vec<String> = tag_freq.into_iter().filter(|(_, c)| *c > threshold).map(|(t, _)| t).collect();
            for member in &group {
                visited.insert(*member);
                if let Some(entry) = entries.get_mut(member) {
                    let before = entry.associations.clone();
                    entry.associations = union_associations(&entry.associations, &common);
                    let added: Vec<String> = entry.associations.iter().filter(|t| !before.contains(t)).cloned().collect();
                    if !added.is_empty() {
                        actions.push(Optimization::Reorganized { id: *member, added_associations: added });
                    }
                }
            }
        }

        // Compression: long-tier groups with pairwise similarity above the
        // configured threshold collapse into a single summary entry.
        let long: Vec<&MemoryEntry> = entries.values().filter(|e| e.tier == Tier::Long).collect();
        let groups = Self::group_by_similarity(&long, self.config.optimization_compression_similarity, true);
        let mut compressions = Vec::new();
        for (source_ids, _strength) in groups {
            let sources: Vec<MemoryEntry> = source_ids.iter().filter_map(|id| entries.get(id).cloned()).collect();
            if sources.len() < 2 {
                continue;
            }
            let themes: Vec<String> = sources.iter().fold(Vec::new(), |acc, e| union_associations(&acc, &e.associations));
            let importances: Vec<f64> = sources.iter().map(|e| e.importance).collect();
            let patterns = serde_json::json!({
                "temporal": temporal_pattern(&sources.iter().map(|e| e.timestamp).collect::<Vec<_>>()),
                "content": content_pattern(&sources.iter().map(|e| e.content.clone()).collect::<Vec<_>>()),
            });
            let summary = serde_json::json!({
                "original_count": sources.len(),
                "key_themes": themes,
                "patterns": patterns,
                SOURCE_IDS_KEY: source_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                "importance_min": importances.iter().cloned().fold(f64::INFINITY, f64::min),
                "importance_max": importances.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            });
            let avg_importance = importances.iter().sum::<f64>() / importances.len() as f64;
            let summary_entry = MemoryEntry::new(Tier::Long, summary, avg_importance, Tier::Long.decay_rate(self.config.base_decay_rate), themes);
            let summary_id = summary_entry.id;
            compressions.push((source_ids, summary_id, summary_entry));
        }
        for (source_ids, summary_id, summary_entry) in compressions {
            for id in &source_ids {
                entries.remove(id);
            }
            entries.insert(summary_id, summary_entry);
            actions.push(Optimization::Compressed { source_ids, summary_id });
        }

        Ok(actions)
    }

    async fn clear(&self, tier: Option<Tier>) -> Result<()> {
        let mut entries = self.entries.write().await;
        match tier {
            Some(t) => entries.retain(|_, e| e.tier != t),
            None => entries.clear(),
        }
        Ok(())
    }

    async fn stats(&self, tier: Option<Tier>) -> Result<MemoryStats> {
        let entries = self.entries.read().await;
        let filtered: Vec<&MemoryEntry> = entries.values().filter(|e| tier.map(|t| t == e.tier).unwrap_or(true)).collect();
        let total_items = filtered.len();
        let size_bytes = total_items * std::mem::size_of::<MemoryEntry>();
        let last_access = filtered.iter().map(|e| e.last_accessed).max().unwrap_or_else(Utc::now);
        let access_count = *self.access_count.read().await;
        let consolidation_count = *self.consolidation_count.read().await;
        Ok(MemoryStats {
            total_items,
            size_bytes,
            last_access,
            access_count,
            consolidation_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::memory::MemoryEntry;

    fn manager() -> InMemoryMemoryManager {
        InMemoryMemoryManager::new(MemoryConfig::default())
    }

    #[tokio::test]
    async fn short_tier_evicts_at_capacity() {
        let mut config = MemoryConfig::default();
        config.capacity_short = 2;
        let mgr = InMemoryMemoryManager::new(config);
        for i in 0..3 {
            mgr.store(MemoryEntry::new(Tier::Short, serde_json::json!({"i": i}), 0.5, 0.1, vec![])).await.unwrap();
        }
        let stats = mgr.stats(Some(Tier::Short)).await.unwrap();
        assert_eq!(stats.total_items, 2);
    }

    #[tokio::test]
    async fn consolidation_merges_similar_entries() {
        let mgr = manager();
        let mut a = MemoryEntry::new(Tier::Short, serde_json::json!({"a": 1}), 0.6, 0.1, vec!["t1".into()]);
        let mut b = MemoryEntry::new(Tier::Short, serde_json::json!({"b": 2}), 0.6, 0.1, vec!["t1".into()]);
        a.timestamp = Utc::now();
        b.timestamp = a.timestamp;
        mgr.store(a).await.unwrap();
        mgr.store(b).await.unwrap();
        let results = mgr.consolidate().await.unwrap();
        assert_eq!(results.len(), 1);
        let stats = mgr.stats(Some(Tier::Short)).await.unwrap();
        assert_eq!(stats.total_items, 0);
        let long_stats = mgr.stats(Some(Tier::Long)).await.unwrap();
        assert_eq!(long_stats.total_items, 1);
    }

    #[tokio::test]
    async fn retrieve_respects_threshold_and_cap() {
        let mgr = manager();
        for i in 0..30 {
            mgr.store(MemoryEntry::new(Tier::Working, serde_json::json!({"n": i}), 0.9, 0.1, vec!["alpha".into()]))
                .await
                .unwrap();
        }
        let results = mgr
            .retrieve(&MemoryQuery { associations: vec!["alpha".into()], tier: Some(Tier::Working), ..Default::default() })
            .await
            .unwrap();
        assert!(results.len() <= RETRIEVAL_MAX_RESULTS);
    }
}
