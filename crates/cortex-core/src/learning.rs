//! Learning domain types: experiences, insights, and the pure
//! experience-analysis / strategy-selection functions the learning engine
//! composes over.

use chrono::{DateTime, Utc};
use cortex_types::{clamp, clamp01, FeedbackType, Id};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub feedback_type: FeedbackType,
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub kind: String,
    pub effects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub state: serde_json::Value,
    pub value: f64,
    pub changes: Vec<String>,
}

/// A single recorded experience fed to the learning engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub id: Id,
    pub timestamp: DateTime<Utc>,
    pub context: HashMap<String, serde_json::Value>,
    pub action: Action,
    pub outcome: Outcome,
    pub feedback: Feedback,
}

impl Experience {
    pub fn new(
        context: HashMap<String, serde_json::Value>,
        action: Action,
        outcome: Outcome,
        feedback: Feedback,
    ) -> Self {
        Self {
            id: cortex_types::new_id(),
            timestamp: Utc::now(),
            context,
            action,
            outcome,
            feedback,
        }
    }
}

/// The classification an experience is analyzed into before strategy
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceType {
    Learning,
    Reasoning,
    Creative,
    ProblemSolving,
    Exploration,
    Default,
}

/// Result of step 1 of the `learn(exp)` pipeline: four scores in `[0,1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceAnalysis {
    pub experience_type: ExperienceType,
    pub complexity: f64,
    pub novelty: f64,
    pub value: f64,
    pub applicability: f64,
}

/// `complexity = clamp01((len(data)/1000 + |context_keys|/10 + |effects|/5) / 3)`
pub fn compute_complexity(data_len: usize, context_keys: usize, effect_count: usize) -> f64 {
    let raw = (data_len as f64 / 1000.0 + context_keys as f64 / 10.0 + effect_count as f64 / 5.0) / 3.0;
    clamp01(raw)
}

/// Cosine-like composite similarity threshold used to decide "similar" prior
/// experiences for novelty scoring.
pub const NOVELTY_SIMILARITY_THRESHOLD: f64 = 0.8;

/// `novelty = max(0.1, 1 - |similar_history| / 10)`
pub fn compute_novelty(similar_count: usize) -> f64 {
    (1.0 - similar_count as f64 / 10.0).max(0.1)
}

/// Value derived from feedback polarity/strength and an outcome-value
/// extractor, averaged.
pub fn compute_value(feedback: &Feedback, outcome_value: f64) -> f64 {
    let polarity = match feedback.feedback_type {
        FeedbackType::Positive => 1.0,
        FeedbackType::Negative => 0.0,
        FeedbackType::Neutral => 0.5,
    };
    let feedback_component = clamp01(polarity * feedback.strength + (1.0 - feedback.strength) * 0.5);
    clamp01((feedback_component + clamp01(outcome_value)) / 2.0)
}

/// Applicability derived from context breadth and presence of prior
/// learnings (the fraction of context keys already seen).
pub fn compute_applicability(context_keys: usize, known_key_overlap: usize) -> f64 {
    if context_keys == 0 {
        return 0.1;
    }
    let breadth = clamp01(context_keys as f64 / 10.0);
    let prior = clamp01(known_key_overlap as f64 / context_keys as f64);
    clamp01(0.5 * breadth + 0.5 * prior)
}

/// Learning algorithm identifiers, used both as the strategy table's
/// vocabulary and as the kind tag on `LearningAlgorithm` implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    Supervised,
    Unsupervised,
    Reinforcement,
    Meta,
    Transfer,
    Active,
    Adaptive,
    Online,
}

/// Primary + secondary algorithms, plus scheduling parameters, for a given
/// experience type.
#[derive(Debug, Clone)]
pub struct LearningStrategy {
    pub primary: AlgorithmKind,
    pub secondary: Vec<AlgorithmKind>,
    pub depth: u32,
    pub exploration_rate: f64,
    pub adaptation_level: f64,
}

/// The fixed experience-type -> algorithm table from the specification.
pub fn determine_strategy(analysis: &ExperienceAnalysis) -> LearningStrategy {
    use AlgorithmKind::*;
    let (primary, secondary) = match analysis.experience_type {
        ExperienceType::Learning => (Supervised, vec![Meta, Transfer]),
        ExperienceType::Reasoning => (Unsupervised, vec![Meta, Active]),
        ExperienceType::Creative => (Reinforcement, vec![Adaptive, Online]),
        ExperienceType::ProblemSolving => (Meta, vec![Transfer, Active]),
        ExperienceType::Exploration => (Active, vec![Online, Adaptive]),
        ExperienceType::Default => (Supervised, vec![Unsupervised]),
    };
    LearningStrategy {
        primary,
        secondary,
        depth: (analysis.complexity * 5.0).ceil() as u32,
        exploration_rate: clamp(analysis.novelty * 0.5, 0.05, 0.5),
        adaptation_level: clamp((analysis.value + analysis.applicability) / 2.0, 0.1, 0.8),
    }
}

/// A structured learning observation, convertible into a knowledge entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningInsight {
    pub pattern: PatternObservation,
    pub generalization: Generalization,
    pub confidence: f64,
    pub applicability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternObservation {
    pub structure_type: String,
    pub elements: Vec<String>,
    pub relationships: Vec<String>,
    pub frequency: u32,
    pub reliability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generalization {
    pub from: Vec<String>,
    pub to: String,
    pub validity: f64,
    pub scope: String,
}

/// Arithmetic-sequence detection on a numeric array of length >= 3: true iff
/// consecutive differences are equal.
pub fn detect_arithmetic_sequence(values: &[f64]) -> bool {
    if values.len() < 3 {
        return false;
    }
    let diff = values[1] - values[0];
    values.windows(2).all(|w| (w[1] - w[0] - diff).abs() < 1e-9)
}

/// Structural pattern classification from the fraction of object/array keys
/// among a flattened key-value set's values.
pub fn classify_structure(nested_fraction: f64, array_fraction: f64) -> &'static str {
    if nested_fraction > 0.5 {
        "nested"
    } else if array_fraction > 0.3 {
        "array-dominant"
    } else {
        "flat"
    }
}

/// An insight batch returned by a pluggable `LearningAlgorithm`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightBatch {
    pub insights: Vec<LearningInsight>,
}

/// Pluggable learning algorithm contract.
#[async_trait::async_trait]
pub trait LearningAlgorithm: Send + Sync {
    fn kind(&self) -> AlgorithmKind;
    async fn learn(&self, batch: &[Experience]) -> cortex_types::Result<InsightBatch>;
}

/// Outcome of a single `learn(experience)` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningResult {
    pub success: bool,
    pub analysis: Option<ExperienceAnalysis>,
    pub insights: Vec<LearningInsight>,
    pub knowledge_ids: Vec<Id>,
    pub confidence: f64,
}

impl LearningResult {
    pub fn failure() -> Self {
        Self {
            success: false,
            analysis: None,
            insights: vec![],
            knowledge_ids: vec![],
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_clamped_and_averaged() {
        assert!((compute_complexity(3000, 30, 15) - 1.0).abs() < 1e-9);
        assert_eq!(compute_complexity(0, 0, 0), 0.0);
    }

    #[test]
    fn novelty_floors_at_point_one() {
        assert_eq!(compute_novelty(20), 0.1);
        assert!((compute_novelty(0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn strategy_table_matches_spec() {
        let analysis = ExperienceAnalysis {
            experience_type: ExperienceType::ProblemSolving,
            complexity: 0.5,
            novelty: 0.4,
            value: 0.6,
            applicability: 0.6,
        };
        let strategy = determine_strategy(&analysis);
        assert_eq!(strategy.primary, AlgorithmKind::Meta);
        assert_eq!(strategy.secondary, vec![AlgorithmKind::Transfer, AlgorithmKind::Active]);
        assert_eq!(strategy.depth, 3);
    }

    #[test]
    fn arithmetic_sequence_detection() {
        assert!(detect_arithmetic_sequence(&[1.0, 3.0, 5.0, 7.0]));
        assert!(!detect_arithmetic_sequence(&[1.0, 3.0, 6.0]));
        assert!(!detect_arithmetic_sequence(&[1.0, 2.0]));
    }
}
