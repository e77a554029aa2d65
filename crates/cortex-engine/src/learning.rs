//! Concrete learning engine: wires the pure experience-analysis and
//! strategy-selection functions from `cortex_core::learning` to a bounded
//! experience history and the knowledge base.

use chrono::Utc;
use cortex_core::knowledge::{IncomingInsight, KnowledgeContent, KnowledgeKind, KnowledgeRepository};
use cortex_core::learning::{
    compute_applicability, compute_complexity, compute_novelty, compute_value, detect_arithmetic_sequence,
    determine_strategy, AlgorithmKind, Experience, ExperienceAnalysis, ExperienceType, Generalization, InsightBatch,
    LearningAlgorithm, LearningInsight, LearningResult, PatternObservation, NOVELTY_SIMILARITY_THRESHOLD,
};
use cortex_core::memory::content_similarity;
use cortex_types::{CortexError, LearningConfig, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{instrument, warn};

const LEARN_WORDS: &[&str] = &["learn", "study", "train"];
const REASON_WORDS: &[&str] = &["reason", "infer", "analyze"];
const CREATE_WORDS: &[&str] = &["create", "generate", "compose", "design"];
const SOLVE_WORDS: &[&str] = &["solve", "fix", "resolve"];
const EXPLORE_WORDS: &[&str] = &["explore", "discover", "search"];

fn classify_experience(action_kind: &str) -> ExperienceType {
    let lower = action_kind.to_lowercase();
    if LEARN_WORDS.iter().any(|w| lower.contains(w)) {
        ExperienceType::Learning
    } else if REASON_WORDS.iter().any(|w| lower.contains(w)) {
        ExperienceType::Reasoning
    } else if CREATE_WORDS.iter().any(|w| lower.contains(w)) {
        ExperienceType::Creative
    } else if SOLVE_WORDS.iter().any(|w| lower.contains(w)) {
        ExperienceType::ProblemSolving
    } else if EXPLORE_WORDS.iter().any(|w| lower.contains(w)) {
        ExperienceType::Exploration
    } else {
        ExperienceType::Default
    }
}

/// A `LearningAlgorithm` that extracts patterns out of numeric arrays and
/// straight-line action -> outcome relationships found in a batch.
pub struct PatternMiner {
    kind: AlgorithmKind,
}

impl PatternMiner {
    pub fn new(kind: AlgorithmKind) -> Self {
        Self { kind }
    }
}

#[async_trait::async_trait]
impl LearningAlgorithm for PatternMiner {
    fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    async fn learn(&self, batch: &[Experience]) -> Result<InsightBatch> {
        let mut insights = Vec::new();
        for experience in batch {
            for (key, value) in &experience.context {
                if let Some(values) = value.as_array() {
                    let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                    if numbers.len() == values.len() && detect_arithmetic_sequence(&numbers) {
                        insights.push(LearningInsight {
                            pattern: PatternObservation {
                                structure_type: "arithmetic_sequence".to_string(),
                                elements: numbers.iter().map(|n| n.to_string()).collect(),
                                relationships: vec![key.clone()],
                                frequency: 1,
                                reliability: 0.8,
                            },
                            generalization: Generalization {
                                from: vec![key.clone()],
                                to: format!("{} follows an arithmetic progression", key),
                                validity: 0.6,
                                scope: experience.action.kind.clone(),
                            },
                            confidence: 0.6,
                            applicability: 0.5,
                        });
                    }
                }
            }

            if !experience.action.effects.is_empty() {
                insights.push(LearningInsight {
                    pattern: PatternObservation {
                        structure_type: "action_effect".to_string(),
                        elements: experience.action.effects.clone(),
                        relationships: vec![experience.action.kind.clone()],
                        frequency: 1,
                        reliability: 0.5,
                    },
                    generalization: Generalization {
                        from: vec![experience.action.kind.clone()],
                        to: experience.action.effects.join(", "),
                        validity: 0.5,
                        scope: "causal".to_string(),
                    },
                    confidence: 0.45 + experience.feedback.strength * 0.3,
                    applicability: 0.4,
                });
            }
        }
        Ok(InsightBatch { insights })
    }
}

pub struct LearningEngine {
    config: LearningConfig,
    algorithms: HashMap<AlgorithmKind, Arc<dyn LearningAlgorithm>>,
    history: Arc<RwLock<VecDeque<Experience>>>,
    knowledge: Arc<dyn KnowledgeRepository>,
}

impl LearningEngine {
    pub fn new(config: LearningConfig, knowledge: Arc<dyn KnowledgeRepository>) -> Self {
        let mut algorithms: HashMap<AlgorithmKind, Arc<dyn LearningAlgorithm>> = HashMap::new();
        for kind in [
            AlgorithmKind::Supervised,
            AlgorithmKind::Unsupervised,
            AlgorithmKind::Reinforcement,
            AlgorithmKind::Meta,
            AlgorithmKind::Transfer,
            AlgorithmKind::Active,
            AlgorithmKind::Adaptive,
            AlgorithmKind::Online,
        ] {
            algorithms.insert(kind, Arc::new(PatternMiner::new(kind)));
        }
        Self { config, algorithms, history: Arc::new(RwLock::new(VecDeque::new())), knowledge }
    }

    async fn similar_history_count(&self, outcome_state: &serde_json::Value, context_keys: &HashSet<String>) -> (usize, usize) {
        let history = self.history.read().await;
        let mut similar = 0;
        let mut known_keys = HashSet::new();
        for past in history.iter() {
            if content_similarity(&past.outcome.state, outcome_state) >= NOVELTY_SIMILARITY_THRESHOLD {
                similar += 1;
            }
            for key in past.context.keys() {
                known_keys.insert(key.clone());
            }
        }
        let overlap = context_keys.intersection(&known_keys).count();
        (similar, overlap)
    }

    async fn analyze(&self, experience: &Experience) -> ExperienceAnalysis {
        let data_len = serde_json::to_string(&experience.context).map(|s| s.len()).unwrap_or(0);
        let context_keys: HashSet<String> = experience.context.keys().cloned().collect();
        let complexity = compute_complexity(data_len, context_keys.len(), experience.action.effects.len());

        let (similar_count, known_overlap) = self.similar_history_count(&experience.outcome.state, &context_keys).await;
        let novelty = compute_novelty(similar_count);
        let value = compute_value(&experience.feedback, experience.outcome.value);
        let applicability = compute_applicability(context_keys.len(), known_overlap);

        ExperienceAnalysis {
            experience_type: classify_experience(&experience.action.kind),
            complexity,
            novelty,
            value,
            applicability,
        }
    }

    async fn push_history(&self, experience: Experience) {
        let mut history = self.history.write().await;
        history.push_back(experience);
        while history.len() > self.config.history_capacity {
            history.pop_front();
        }
    }

    async fn recent_batch(&self, limit: usize) -> Vec<Experience> {
        let history = self.history.read().await;
        history.iter().rev().take(limit).cloned().collect()
    }

    #[instrument(skip(self, experience))]
    pub async fn learn(&self, experience: Experience) -> Result<LearningResult> {
        let analysis = self.analyze(&experience).await;
        let strategy = determine_strategy(&analysis);

        let mut batch = self.recent_batch(20).await;
        batch.push(experience.clone());

        let mut insights = Vec::new();
        let mut attempted = 0usize;
        let mut failed = 0usize;
        for kind in std::iter::once(strategy.primary).chain(strategy.secondary.iter().copied()) {
            if let Some(algorithm) = self.algorithms.get(&kind) {
                attempted += 1;
                match algorithm.learn(&batch).await {
                    Ok(batch_result) => insights.extend(batch_result.insights),
                    Err(err) => {
                        failed += 1;
                        warn!(algorithm = ?kind, error = %err, "learning algorithm failed");
                    }
                }
            }
        }

        if attempted > 0 && failed == attempted {
            self.push_history(experience).await;
            return Ok(LearningResult::failure());
        }

        let mut knowledge_ids = Vec::new();
        let qualifying: Vec<&LearningInsight> =
            insights.iter().filter(|i| i.confidence >= self.config.insight_confidence_threshold).collect();
        if !qualifying.is_empty() {
            let incoming: Vec<IncomingInsight> = qualifying
                .iter()
                .map(|insight| IncomingInsight {
                    kind: KnowledgeKind::Pattern,
                    content: KnowledgeContent {
                        representation: insight.pattern.structure_type.clone(),
                        meaning: insight.generalization.to.clone(),
                        domain: insight.generalization.scope.clone(),
                        relationships: insight.pattern.relationships.clone(),
                    },
                    confidence: insight.confidence,
                    source: "learning_engine".to_string(),
                    pattern_text: insight.generalization.to.clone(),
                })
                .collect();
            match self.knowledge.integrate_learning(incoming).await {
                Ok(result) => {
                    knowledge_ids.extend(result.stored_ids);
                    knowledge_ids.extend(result.reinforced_ids);
                }
                Err(err) => warn!(error = %err, "failed to integrate learning insights into knowledge base"),
            }
        }

        self.push_history(experience).await;

        let confidence = if insights.is_empty() {
            analysis.value
        } else {
            insights.iter().map(|i| i.confidence).sum::<f64>() / insights.len() as f64
        };

        Ok(LearningResult { success: true, analysis: Some(analysis), insights, knowledge_ids, confidence })
    }

    pub async fn learn_from_execution(
        &self,
        plan_kind: &str,
        effects: Vec<String>,
        outcome_state: serde_json::Value,
        outcome_value: f64,
        positive: bool,
    ) -> Result<LearningResult> {
        let experience = Experience::new(
            HashMap::new(),
            cortex_core::learning::Action { kind: plan_kind.to_string(), effects },
            cortex_core::learning::Outcome { state: outcome_state, value: outcome_value, changes: vec![] },
            cortex_core::learning::Feedback {
                feedback_type: if positive { cortex_types::FeedbackType::Positive } else { cortex_types::FeedbackType::Negative },
                strength: 0.7,
            },
        );
        self.learn(experience).await
    }

    pub async fn transfer_knowledge(&self, source_domain: &str, target_domain: &str) -> Result<LearningResult> {
        if source_domain.is_empty() || target_domain.is_empty() {
            return Err(CortexError::InvalidInput("source and target domains must be non-empty".into()));
        }
        let insight = LearningInsight {
            pattern: PatternObservation {
                structure_type: "domain_transfer".to_string(),
                elements: vec![source_domain.to_string()],
                relationships: vec![target_domain.to_string()],
                frequency: 1,
                reliability: 0.5,
            },
            generalization: Generalization {
                from: vec![source_domain.to_string()],
                to: target_domain.to_string(),
                validity: 0.6,
                scope: "cross-domain".to_string(),
            },
            confidence: 0.6,
            applicability: 0.5,
        };

        let mut knowledge_ids = Vec::new();
        if insight.confidence >= self.config.insight_confidence_threshold {
            let incoming = IncomingInsight {
                kind: KnowledgeKind::Strategy,
                content: KnowledgeContent {
                    representation: "domain_transfer".into(),
                    meaning: format!("concepts from {} transfer to {}", source_domain, target_domain),
                    domain: target_domain.to_string(),
                    relationships: vec![source_domain.to_string()],
                },
                confidence: insight.confidence,
                source: "transfer_learning".into(),
                pattern_text: target_domain.to_string(),
            };
            let result = self.knowledge.integrate_learning(vec![incoming]).await?;
            knowledge_ids.extend(result.stored_ids);
        }

        Ok(LearningResult {
            success: true,
            analysis: None,
            insights: vec![insight.clone()],
            knowledge_ids,
            confidence: insight.confidence,
        })
    }

    pub async fn analyze_patterns(&self) -> Vec<PatternObservation> {
        let history = self.history.read().await;
        let mut frequency: HashMap<String, u32> = HashMap::new();
        for experience in history.iter() {
            *frequency.entry(experience.action.kind.clone()).or_insert(0) += 1;
        }
        frequency
            .into_iter()
            .map(|(kind, count)| PatternObservation {
                structure_type: "action_frequency".to_string(),
                elements: vec![kind.clone()],
                relationships: vec![],
                frequency: count,
                reliability: (count as f64 / history.len().max(1) as f64).min(1.0),
            })
            .collect()
    }

    pub async fn state(&self) -> LearningEngineState {
        let history = self.history.read().await;
        LearningEngineState {
            history_len: history.len(),
            history_capacity: self.config.history_capacity,
            last_experience_at: history.back().map(|e| e.timestamp).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LearningEngineState {
    pub history_len: usize,
    pub history_capacity: usize,
    pub last_experience_at: chrono::DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::learning::{Action, Feedback, Outcome};
    use cortex_infra::InMemoryKnowledgeBase;

    fn engine() -> LearningEngine {
        LearningEngine::new(LearningConfig::default(), Arc::new(InMemoryKnowledgeBase::new()))
    }

    fn experience(kind: &str) -> Experience {
        Experience::new(
            HashMap::new(),
            Action { kind: kind.to_string(), effects: vec!["changed state".to_string()] },
            Outcome { state: serde_json::json!({"ok": true}), value: 0.8, changes: vec![] },
            Feedback { feedback_type: cortex_types::FeedbackType::Positive, strength: 0.9 },
        )
    }

    #[tokio::test]
    async fn learn_classifies_and_records_history() {
        let engine = engine();
        let result = engine.learn(experience("solve the puzzle")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.analysis.unwrap().experience_type, ExperienceType::ProblemSolving);
        let state = engine.state().await;
        assert_eq!(state.history_len, 1);
    }

    #[tokio::test]
    async fn high_confidence_insights_become_knowledge() {
        let engine = engine();
        for _ in 0..2 {
            engine.learn(experience("solve the puzzle")).await.unwrap();
        }
        let last = engine.learn(experience("solve the puzzle")).await.unwrap();
        assert!(!last.insights.is_empty());
    }

    #[tokio::test]
    async fn transfer_knowledge_requires_domains() {
        let engine = engine();
        assert!(engine.transfer_knowledge("", "target").await.is_err());
        let result = engine.transfer_knowledge("math", "music").await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn history_bounded_by_capacity() {
        let mut config = LearningConfig::default();
        config.history_capacity = 3;
        let engine = LearningEngine::new(config, Arc::new(InMemoryKnowledgeBase::new()));
        for _ in 0..5 {
            engine.learn(experience("learn something")).await.unwrap();
        }
        let state = engine.state().await;
        assert_eq!(state.history_len, 3);
    }
}
