//! Reasoning domain types and the pure backend-selection / synthesis logic
//! that the reasoning engine composes over.

use chrono::{DateTime, Utc};
use cortex_types::{clamp01, Id};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A pluggable logic backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Classical,
    Fuzzy,
    Probabilistic,
    Modal,
    Temporal,
    Quantum,
    Tensor,
    Decision,
    Inference,
    ProblemSolver,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Classical => "classical",
            BackendKind::Fuzzy => "fuzzy",
            BackendKind::Probabilistic => "probabilistic",
            BackendKind::Modal => "modal",
            BackendKind::Temporal => "temporal",
            BackendKind::Quantum => "quantum",
            BackendKind::Tensor => "tensor",
            BackendKind::Decision => "decision",
            BackendKind::Inference => "inference",
            BackendKind::ProblemSolver => "problem_solver",
        }
    }
}

/// Output of `analyze_requirements`: the pure function that the backend
/// selection table is keyed on.
#[derive(Debug, Clone, Default)]
pub struct RequirementsAnalysis {
    pub temporal: bool,
    pub modal: bool,
    pub probabilistic_uncertainty: bool,
    pub fuzzy: bool,
    pub quantum: bool,
    pub tensor: bool,
    pub decision_intent: bool,
    pub inference_intent: bool,
    pub problem_solving_intent: bool,
    pub complexity: f64,
    pub uncertainty: f64,
}

/// One backend selected for a request, with its normalized weight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackendSelection {
    pub kind: BackendKind,
    pub weight: f64,
}

/// Apply the selection table in order, then normalize weights to sum to 1.
/// `enabled` restricts which backend kinds may be chosen.
pub fn select_backends(req: &RequirementsAnalysis, enabled: &[String]) -> Vec<BackendSelection> {
    let is_enabled = |k: BackendKind| enabled.iter().any(|e| e == k.as_str());

    let mut raw: Vec<(BackendKind, f64)> = Vec::new();
    if is_enabled(BackendKind::Classical) {
        raw.push((BackendKind::Classical, 0.3));
    }
    if req.uncertainty > 0.6 && is_enabled(BackendKind::Probabilistic) {
        raw.push((BackendKind::Probabilistic, 0.4));
    }
    if req.fuzzy && is_enabled(BackendKind::Fuzzy) {
        raw.push((BackendKind::Fuzzy, 0.3));
    }
    if req.temporal && is_enabled(BackendKind::Temporal) {
        raw.push((BackendKind::Temporal, 0.3));
    }
    if req.modal && is_enabled(BackendKind::Modal) {
        raw.push((BackendKind::Modal, 0.3));
    }
    if req.quantum && is_enabled(BackendKind::Quantum) {
        raw.push((BackendKind::Quantum, 0.2));
    }
    if (req.tensor || req.complexity > 0.7) && is_enabled(BackendKind::Tensor) {
        raw.push((BackendKind::Tensor, 0.4));
    }
    if req.decision_intent && is_enabled(BackendKind::Decision) {
        raw.push((BackendKind::Decision, 0.4));
    }
    if req.inference_intent && is_enabled(BackendKind::Inference) {
        raw.push((BackendKind::Inference, 0.3));
    }
    if req.problem_solving_intent && is_enabled(BackendKind::ProblemSolver) {
        raw.push((BackendKind::ProblemSolver, 0.4));
    }

    let total: f64 = raw.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    raw.into_iter()
        .map(|(kind, w)| BackendSelection { kind, weight: w / total })
        .collect()
}

/// A single conclusion produced by a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conclusion {
    pub statement: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub implications: Vec<String>,
}

/// A single step in a reasoning chain, for audit/explanation purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub backend: BackendKind,
    pub description: String,
}

/// Qualitative uncertainty label derived from confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyLabel {
    High,
    Medium,
    Low,
}

pub fn uncertainty_label(confidence: f64) -> UncertaintyLabel {
    if confidence > 0.7 {
        UncertaintyLabel::High
    } else if confidence > 0.4 {
        UncertaintyLabel::Medium
    } else {
        UncertaintyLabel::Low
    }
}

/// Deterministic second-pass annotation over a synthesized result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaReasoning {
    pub quality: f64,
    pub justification: String,
    pub limitations: Vec<String>,
    pub improvements: Vec<String>,
}

/// Fixed confidence-justification table, keyed by the same thresholds as
/// `uncertainty_label`.
pub fn confidence_justification(confidence: f64) -> &'static str {
    if confidence > 0.85 {
        "strong agreement across backends with high individual confidence"
    } else if confidence > 0.7 {
        "consistent agreement across the selected backends"
    } else if confidence > 0.4 {
        "partial agreement; some backends diverged or reported moderate confidence"
    } else {
        "weak or conflicting signal across backends"
    }
}

/// Compute the deterministic meta-reasoning annotation for a synthesized
/// result.
pub fn meta_reason(confidence: f64, backend_count: usize, conclusion_count: usize) -> MetaReasoning {
    let quality = clamp01(confidence * 0.7 + (backend_count.min(4) as f64 / 4.0) * 0.3);
    let mut limitations = Vec::new();
    if backend_count <= 1 {
        limitations.push("single backend, no cross-validation".to_string());
    }
    if conclusion_count == 0 {
        limitations.push("no conclusions synthesized".to_string());
    }
    let mut improvements = Vec::new();
    if confidence < 0.7 {
        improvements.push("enable additional backends to corroborate the result".to_string());
    }
    if conclusion_count > 5 {
        improvements.push("tighten deduplication or narrow the input scope".to_string());
    }
    MetaReasoning {
        quality,
        justification: confidence_justification(confidence).to_string(),
        limitations,
        improvements,
    }
}

/// Outcome of a quantum-mode measurement: the backend the Born-rule draw
/// selected, that draw's amplitude/phase, and the resulting phase coherence.
/// Shaped like `cortex_core::consciousness::SuperpositionState` plus the
/// chosen backend so the orchestrator can push it straight into the
/// consciousness state's superposition history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuantumMeasurement {
    pub measured_state: BackendKind,
    pub amplitude: f64,
    pub phase: f64,
    pub coherence: f64,
}

/// The full result of a `reason`/`solve`/`infer` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningResult {
    pub conclusions: Vec<Conclusion>,
    pub steps: Vec<ReasoningStep>,
    pub confidence: f64,
    pub uncertainty: f64,
    pub alternatives: Vec<String>,
    pub backends_used: Vec<BackendSelection>,
    pub meta: Option<MetaReasoning>,
    pub quantum: Option<QuantumMeasurement>,
}

impl ReasoningResult {
    /// Canonical zero-confidence shape for null/empty input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            conclusions: vec![Conclusion {
                statement: message.into(),
                confidence: 0.0,
                evidence: vec![],
                implications: vec![],
            }],
            steps: vec![],
            confidence: 0.0,
            uncertainty: 1.0,
            alternatives: vec![],
            backends_used: vec![],
            meta: None,
            quantum: None,
        }
    }
}

/// Deduplicate conclusions by lowercase-trimmed statement, preserving
/// first-occurrence order.
pub fn dedup_conclusions(conclusions: Vec<Conclusion>) -> Vec<Conclusion> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for c in conclusions {
        let key = c.statement.trim().to_lowercase();
        if seen.insert(key) {
            out.push(c);
        }
    }
    out
}

/// Weighted-mean confidence across backend outputs.
pub fn weighted_confidence(per_backend: &[(BackendSelection, f64)]) -> f64 {
    let total_weight: f64 = per_backend.iter().map(|(b, _)| b.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let sum: f64 = per_backend.iter().map(|(b, conf)| b.weight * conf).sum();
    clamp01(sum / total_weight)
}

/// Bounded performance-history ring for a reasoning strategy (backend kind).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveStrategy {
    pub id: BackendKind,
    pub confidence: f64,
    pub success_rate: f64,
    pub adaptation_rate: f64,
    pub last_used: DateTime<Utc>,
    pub history: VecDeque<f64>,
}

pub const STRATEGY_HISTORY_CAP: usize = 10;
pub const SUCCESS_RATE_WINDOW: usize = 5;

impl AdaptiveStrategy {
    pub fn new(id: BackendKind) -> Self {
        Self {
            id,
            confidence: 0.5,
            success_rate: 0.0,
            adaptation_rate: 0.5,
            last_used: Utc::now(),
            history: VecDeque::new(),
        }
    }

    /// Push a performance observation and recompute `success_rate` and
    /// `confidence` per the documented invariants.
    pub fn record_performance(&mut self, performance: f64) {
        self.history.push_back(clamp01(performance));
        while self.history.len() > STRATEGY_HISTORY_CAP {
            self.history.pop_front();
        }
        let window: Vec<f64> = self
            .history
            .iter()
            .rev()
            .take(SUCCESS_RATE_WINDOW)
            .copied()
            .collect();
        self.success_rate = if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<f64>() / window.len() as f64
        };
        self.confidence = cortex_types::clamp(self.confidence + (performance - 0.5) * 0.1, 0.0, 1.0);
        self.last_used = Utc::now();
    }

    /// Scalar performance per the documented formula.
    pub fn performance(result_confidence: f64, meta_quality: f64, adaptation_rate: f64) -> f64 {
        clamp01(0.4 * result_confidence + 0.4 * meta_quality + 0.2 * adaptation_rate)
    }

    /// Whether this strategy is eligible for reselection: `success_rate`
    /// above `threshold`, or unused for more than 24 hours.
    pub fn eligible_for_reselection(&self, threshold: f64, now: DateTime<Utc>) -> bool {
        self.success_rate > threshold || (now - self.last_used).num_hours() > 24
    }
}

/// Pluggable logic backend contract.
#[async_trait::async_trait]
pub trait LogicBackend: Send + Sync {
    fn kind(&self) -> BackendKind;
    async fn reason(
        &self,
        input: &str,
        context: &HashMap<String, serde_json::Value>,
    ) -> cortex_types::Result<ReasoningResult>;
}

/// A single logic state in the quantum-inspired superposition.
#[derive(Debug, Clone, Copy)]
pub struct LogicState {
    pub backend: BackendKind,
    pub amplitude: f64,
    pub phase: f64,
}

/// Normalize amplitudes so that the sum of squares is 1 (probabilities sum
/// to 1 under Born-rule measurement).
pub fn normalize_amplitudes(states: &mut [LogicState]) {
    let norm: f64 = states.iter().map(|s| s.amplitude * s.amplitude).sum::<f64>().sqrt();
    if norm > 0.0 {
        for s in states.iter_mut() {
            s.amplitude /= norm;
        }
    }
}

/// Perform a weighted-choice measurement by amplitude-squared, given a
/// uniform random draw in `[0,1)`.
pub fn measure(states: &[LogicState], draw: f64) -> Option<usize> {
    if states.is_empty() {
        return None;
    }
    let total: f64 = states.iter().map(|s| s.amplitude * s.amplitude).sum();
    if total <= 0.0 {
        return Some(0);
    }
    let mut acc = 0.0;
    for (i, s) in states.iter().enumerate() {
        acc += (s.amplitude * s.amplitude) / total;
        if draw < acc {
            return Some(i);
        }
    }
    Some(states.len() - 1)
}

/// Coherence of a set of phases: `exp(-variance(phases))`.
pub fn phase_coherence(phases: &[f64]) -> f64 {
    if phases.is_empty() {
        return 1.0;
    }
    let mean = phases.iter().sum::<f64>() / phases.len() as f64;
    let variance = phases.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / phases.len() as f64;
    (-variance).exp()
}

pub type BackendId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_normalizes_to_one() {
        let req = RequirementsAnalysis {
            probabilistic_uncertainty: true,
            uncertainty: 0.9,
            tensor: true,
            ..Default::default()
        };
        let enabled = cortex_types::ReasoningConfig::default().backends_enabled;
        let selected = select_backends(&req, &enabled);
        let sum: f64 = selected.iter().map(|s| s.weight).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn dedup_preserves_first_occurrence() {
        let conclusions = vec![
            Conclusion { statement: "X implies Y".into(), confidence: 0.9, evidence: vec![], implications: vec![] },
            Conclusion { statement: "x Implies y".into(), confidence: 0.8, evidence: vec![], implications: vec![] },
            Conclusion { statement: "Z".into(), confidence: 0.7, evidence: vec![], implications: vec![] },
        ];
        let deduped = dedup_conclusions(conclusions);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].statement, "X implies Y");
        assert_eq!(deduped[1].statement, "Z");
    }

    #[test]
    fn adaptive_strategy_matches_worked_example() {
        let mut strategy = AdaptiveStrategy::new(BackendKind::Classical);
        strategy.history.extend([0.6, 0.7]);
        let before_confidence = strategy.confidence;
        strategy.record_performance(0.8);
        assert_eq!(strategy.history.len(), 3);
        assert!((strategy.success_rate - 0.7).abs() < 1e-9);
        assert!((strategy.confidence - (before_confidence + 0.03)).abs() < 1e-9);
    }

    #[test]
    fn history_bounded_at_ten() {
        let mut strategy = AdaptiveStrategy::new(BackendKind::Classical);
        for i in 0..20 {
            strategy.record_performance((i as f64 / 20.0).min(1.0));
        }
        assert!(strategy.history.len() <= STRATEGY_HISTORY_CAP);
    }

    #[test]
    fn quantum_measurement_picks_among_nonzero_amplitudes() {
        let states = vec![
            LogicState { backend: BackendKind::Classical, amplitude: 0.5, phase: 0.1 },
            LogicState { backend: BackendKind::Fuzzy, amplitude: 0.5, phase: 0.2 },
            LogicState { backend: BackendKind::Probabilistic, amplitude: 0.0, phase: 0.3 },
            LogicState { backend: BackendKind::Modal, amplitude: 0.0, phase: 0.4 },
        ];
        for draw in [0.0, 0.25, 0.49, 0.5, 0.75, 0.99] {
            let idx = measure(&states, draw).unwrap();
            assert!(idx == 0 || idx == 1);
        }
    }

    #[test]
    fn uncertainty_label_thresholds() {
        assert_eq!(uncertainty_label(0.8), UncertaintyLabel::High);
        assert_eq!(uncertainty_label(0.5), UncertaintyLabel::Medium);
        assert_eq!(uncertainty_label(0.2), UncertaintyLabel::Low);
    }
}
