//! Multi-modal reasoning engine: backend selection, concurrent execution,
//! synthesis, meta-reasoning, and adaptive strategy tracking.

use chrono::Utc;
use cortex_core::consciousness::ConsciousnessState;
use cortex_core::reasoning::{
    dedup_conclusions, measure, meta_reason, normalize_amplitudes, phase_coherence, select_backends,
    weighted_confidence, AdaptiveStrategy, BackendKind, BackendSelection, Conclusion, LogicBackend, LogicState,
    QuantumMeasurement, ReasoningResult, ReasoningStep, RequirementsAnalysis,
};
use cortex_types::{clamp01, CortexError, Id, ReasoningConfig, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, instrument, warn};

const FUZZY_WORDS: &[&str] = &["maybe", "roughly", "approximately", "fuzzy", "vague", "somewhat"];
const TEMPORAL_WORDS: &[&str] = &["before", "after", "during", "until", "since", "timeline"];
const MODAL_WORDS: &[&str] = &["must", "may", "possible", "necessary", "could", "should"];
const QUANTUM_WORDS: &[&str] = &["quantum", "superposition", "entangle"];
const TENSOR_WORDS: &[&str] = &["tensor", "matrix", "dimension", "embedding"];
const DECISION_WORDS: &[&str] = &["decide", "choose", "select", "option"];
const INFERENCE_WORDS: &[&str] = &["infer", "conclude", "therefore", "deduce"];
const PROBLEM_WORDS: &[&str] = &["solve", "problem", "fix", "resolve"];
const UNCERTAINTY_WORDS: &[&str] = &["maybe", "unsure", "uncertain", "perhaps", "possibly"];

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

/// Pure function analyzing an input + context into the booleans and scalars
/// that drive backend selection.
pub fn analyze_requirements(input: &str, context: &HashMap<String, serde_json::Value>) -> RequirementsAnalysis {
    let lower = input.to_lowercase();
    let word_count = lower.split_whitespace().count();

    let context_uncertainty = context.get("uncertainty").and_then(|v| v.as_f64());
    let word_uncertainty = {
        let hits = UNCERTAINTY_WORDS.iter().filter(|w| lower.contains(*w)).count();
        clamp01(hits as f64 / 3.0)
    };
    let uncertainty = context_uncertainty.unwrap_or(word_uncertainty);

    let category_hits = [
        contains_any(&lower, TEMPORAL_WORDS),
        contains_any(&lower, MODAL_WORDS),
        contains_any(&lower, FUZZY_WORDS),
        contains_any(&lower, QUANTUM_WORDS),
        contains_any(&lower, TENSOR_WORDS),
    ]
    .iter()
    .filter(|b| **b)
    .count();

    let complexity = clamp01(word_count as f64 / 60.0 + category_hits as f64 / 5.0);

    RequirementsAnalysis {
        temporal: contains_any(&lower, TEMPORAL_WORDS),
        modal: contains_any(&lower, MODAL_WORDS),
        probabilistic_uncertainty: uncertainty > 0.6,
        fuzzy: contains_any(&lower, FUZZY_WORDS),
        quantum: contains_any(&lower, QUANTUM_WORDS),
        tensor: contains_any(&lower, TENSOR_WORDS),
        decision_intent: contains_any(&lower, DECISION_WORDS),
        inference_intent: contains_any(&lower, INFERENCE_WORDS),
        problem_solving_intent: contains_any(&lower, PROBLEM_WORDS),
        complexity,
        uncertainty,
    }
}

/// A heuristic backend: a small, deterministic stand-in satisfying the
/// `LogicBackend` contract. Per-backend inner algorithms are out of scope;
/// this backend differentiates itself by kind-specific phrasing and a
/// kind-biased confidence estimate.
pub struct HeuristicBackend {
    kind: BackendKind,
}

impl HeuristicBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }

    fn phrase(&self, input: &str) -> String {
        let trimmed = input.trim();
        match self.kind {
            BackendKind::Classical => format!("direct analysis concludes: {}", trimmed),
            BackendKind::Fuzzy => format!("fuzzy evaluation suggests: {}", trimmed),
            BackendKind::Probabilistic => format!("probabilistic estimate: {}", trimmed),
            BackendKind::Modal => format!("under the stated possibilities: {}", trimmed),
            BackendKind::Temporal => format!("considering the timeline: {}", trimmed),
            BackendKind::Quantum => format!("superposed interpretation collapses to: {}", trimmed),
            BackendKind::Tensor => format!("structural decomposition yields: {}", trimmed),
            BackendKind::Decision => format!("recommended choice: {}", trimmed),
            BackendKind::Inference => format!("therefore: {}", trimmed),
            BackendKind::ProblemSolver => format!("proposed resolution: {}", trimmed),
        }
    }

    fn base_confidence(&self, input: &str, req: &RequirementsAnalysis) -> f64 {
        let length_component = clamp01(input.split_whitespace().count() as f64 / 40.0);
        let bias = match self.kind {
            BackendKind::Classical => 0.7,
            BackendKind::Probabilistic => 1.0 - req.uncertainty,
            BackendKind::Fuzzy => 0.55,
            BackendKind::Quantum => 0.6,
            BackendKind::Tensor => 0.65 + req.complexity * 0.1,
            _ => 0.65,
        };
        clamp01(0.5 * bias + 0.5 * length_component)
    }
}

#[async_trait::async_trait]
impl LogicBackend for HeuristicBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn reason(&self, input: &str, context: &HashMap<String, serde_json::Value>) -> Result<ReasoningResult> {
        if input.trim().is_empty() {
            return Err(CortexError::InvalidInput("empty input".into()));
        }
        let req = analyze_requirements(input, context);
        let confidence = self.base_confidence(input, &req);
        Ok(ReasoningResult {
            conclusions: vec![Conclusion {
                statement: self.phrase(input),
                confidence,
                evidence: vec![input.to_string()],
                implications: vec![],
            }],
            steps: vec![ReasoningStep {
                backend: self.kind,
                description: format!("{:?} backend evaluated the input", self.kind),
            }],
            confidence,
            uncertainty: clamp01(1.0 - confidence),
            alternatives: vec![],
            backends_used: vec![],
            meta: None,
            quantum: None,
        })
    }
}

/// A decision made by routing through the decision backend plus `reason`.
#[derive(Debug, Clone)]
pub struct Decision {
    pub chosen: String,
    pub reasoning: ReasoningResult,
}

#[derive(Debug, Clone)]
pub struct TaskResult {
    pub result: ReasoningResult,
}

#[derive(Debug, Clone, Default)]
struct IntentOverride {
    decision: bool,
    inference: bool,
    problem_solving: bool,
}

pub struct ReasoningEngine {
    config: ReasoningConfig,
    fanout_max: usize,
    strategies: Arc<RwLock<HashMap<BackendKind, AdaptiveStrategy>>>,
    word_splitter: Regex,
    /// Shared with the orchestrator's consciousness state. Read-only here:
    /// downstream scaling (adaptive exploration) consults it, but only the
    /// orchestrator mutates it.
    consciousness: Arc<RwLock<ConsciousnessState>>,
}

impl ReasoningEngine {
    pub fn new(config: ReasoningConfig, fanout_max: usize, consciousness: Arc<RwLock<ConsciousnessState>>) -> Self {
        Self {
            config,
            fanout_max: fanout_max.max(1),
            strategies: Arc::new(RwLock::new(HashMap::new())),
            word_splitter: Regex::new(r"\s+").expect("static regex"),
            consciousness,
        }
    }

    pub async fn strategy_snapshot(&self) -> Vec<AdaptiveStrategy> {
        self.strategies.read().await.values().cloned().collect()
    }

    #[instrument(skip(self, context))]
    pub async fn reason(&self, input: &str, context: &HashMap<String, serde_json::Value>) -> Result<ReasoningResult> {
        self.reason_with(input, context, IntentOverride::default()).await
    }

    async fn reason_with(
        &self,
        input: &str,
        context: &HashMap<String, serde_json::Value>,
        force: IntentOverride,
    ) -> Result<ReasoningResult> {
        if input.trim().is_empty() {
            return Ok(ReasoningResult::invalid_input("empty or null input"));
        }

        let mut req = analyze_requirements(input, context);
        req.decision_intent |= force.decision;
        req.inference_intent |= force.inference;
        req.problem_solving_intent |= force.problem_solving;

        let selections = self.select_with_adaptive_reuse(&req).await;
        if selections.is_empty() {
            return Ok(ReasoningResult::invalid_input("no reasoning backend selected"));
        }

        let semaphore = Arc::new(Semaphore::new(self.fanout_max));
        let mut handles = Vec::with_capacity(selections.len());
        for selection in selections.iter().copied() {
            let sem = semaphore.clone();
            let input = input.to_string();
            let context = context.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                let backend = HeuristicBackend::new(selection.kind);
                let started = std::time::Instant::now();
                let outcome = backend.reason(&input, &context).await;
                (selection, outcome, started.elapsed())
            }));
        }

        let mut successes: Vec<(BackendSelection, ReasoningResult)> = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((selection, Ok(result), elapsed)) => {
                    debug!(backend = ?selection.kind, elapsed_ms = elapsed.as_millis() as u64, "backend produced a result");
                    successes.push((selection, result));
                }
                Ok((selection, Err(err), _)) => {
                    warn!(backend = ?selection.kind, error = %err, "backend failed locally");
                }
                Err(join_err) => {
                    warn!(error = %join_err, "backend task panicked or was cancelled");
                }
            }
        }

        if successes.is_empty() {
            return Err(CortexError::ReasoningExhausted);
        }

        let used_total_weight: f64 = successes.iter().map(|(s, _)| s.weight).sum();
        let backends_used: Vec<BackendSelection> = successes
            .iter()
            .map(|(s, _)| BackendSelection { kind: s.kind, weight: s.weight / used_total_weight })
            .collect();

        let conclusions = dedup_conclusions(successes.iter().flat_map(|(_, r)| r.conclusions.clone()).collect());
        let steps: Vec<ReasoningStep> = successes.iter().flat_map(|(_, r)| r.steps.clone()).collect();
        let alternatives: Vec<String> = successes.iter().flat_map(|(_, r)| r.alternatives.clone()).collect();

        let weighted: Vec<(BackendSelection, f64)> = backends_used
            .iter()
            .zip(successes.iter())
            .map(|(normalized, (_, r))| (*normalized, r.confidence))
            .collect();
        let confidence = weighted_confidence(&weighted);
        let uncertainty = clamp01(1.0 - confidence);

        let meta = meta_reason(confidence, backends_used.len(), conclusions.len());

        let mut result = ReasoningResult {
            conclusions,
            steps,
            confidence,
            uncertainty,
            alternatives,
            backends_used,
            meta: Some(meta.clone()),
            quantum: None,
        };

        if req.quantum {
            self.apply_quantum_measurement(&mut result, &successes).await;
        }

        self.update_adaptive_strategies(&result, &meta).await;

        Ok(result)
    }

    /// Select backends from the fixed table, then fold in any strategy that
    /// is eligible for reuse (high recent success rate, or idle > 24h) but
    /// was not already selected, with a weight scaled by its confidence.
    /// The reselection threshold is itself scaled by consciousness
    /// `plasticity`: a more plastic state widens the window and explores
    /// more adaptive strategies.
    async fn select_with_adaptive_reuse(&self, req: &RequirementsAnalysis) -> Vec<BackendSelection> {
        let mut selections = select_backends(req, &self.config.backends_enabled);
        let strategies = self.strategies.read().await;
        let now = Utc::now();
        let already_selected: std::collections::HashSet<BackendKind> = selections.iter().map(|s| s.kind).collect();

        let plasticity = self.consciousness.read().await.plasticity;
        let threshold = (self.config.adaptive_threshold * (1.0 - plasticity * 0.3)).max(0.05);

        let mut extra = Vec::new();
        for strategy in strategies.values() {
            if already_selected.contains(&strategy.id) {
                continue;
            }
            if self.config.backends_enabled.iter().any(|b| b == strategy.id.as_str())
                && strategy.eligible_for_reselection(threshold, now)
            {
                extra.push(BackendSelection { kind: strategy.id, weight: strategy.confidence * 0.2 });
            }
        }
        drop(strategies);

        if extra.is_empty() {
            return selections;
        }
        selections.extend(extra);
        let total: f64 = selections.iter().map(|s| s.weight).sum();
        if total > 0.0 {
            for s in selections.iter_mut() {
                s.weight /= total;
            }
        }
        selections
    }

    /// Measure a superposition over candidate backends and let the chosen
    /// state's own result (confidence/conclusions) drive the returned
    /// result, augmented by the measurement's coherence. `successes` is the
    /// set of backends that actually ran this call; if the measured backend
    /// is among them its own synthesis is substituted for the multi-backend
    /// one, otherwise the existing synthesis is kept and only annotated.
    async fn apply_quantum_measurement(&self, result: &mut ReasoningResult, successes: &[(BackendSelection, ReasoningResult)]) {
        let candidate_kinds = [BackendKind::Classical, BackendKind::Fuzzy, BackendKind::Probabilistic, BackendKind::Modal];
        let quantum_factor = self.consciousness.read().await.quantum_factor;
        let max_states = ((self.config.quantum_max_states as f64) * (0.5 + quantum_factor)).round().max(1.0) as usize;
        let mut states: Vec<LogicState> = candidate_kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let amplitude = successes
                    .iter()
                    .find(|(s, _)| s.kind == *kind)
                    .map(|(_, r)| r.confidence)
                    .unwrap_or((result.confidence + i as f64 * 0.1).max(0.01));
                LogicState { backend: *kind, amplitude: amplitude.max(0.01), phase: (i as f64) * std::f64::consts::PI / 4.0 }
            })
            .take(max_states.max(1))
            .collect();
        normalize_amplitudes(&mut states);
        let draw = rand::random::<f64>();
        if let Some(idx) = measure(&states, draw) {
            let phases: Vec<f64> = states.iter().take(2).map(|s| s.phase).collect();
            let coherence = phase_coherence(&phases);
            let chosen = states[idx];

            if let Some((_, backend_result)) = successes.iter().find(|(s, _)| s.kind == chosen.backend) {
                result.conclusions = backend_result.conclusions.clone();
                result.confidence = backend_result.confidence;
                result.uncertainty = backend_result.uncertainty;
            }

            result
                .alternatives
                .push(format!("quantum measurement selected {:?} (coherence {:.4})", chosen.backend, coherence));
            result.quantum = Some(QuantumMeasurement {
                measured_state: chosen.backend,
                amplitude: chosen.amplitude,
                phase: chosen.phase,
                coherence,
            });
        }
    }

    async fn update_adaptive_strategies(&self, result: &ReasoningResult, meta: &cortex_core::reasoning::MetaReasoning) {
        let mut strategies = self.strategies.write().await;
        for selection in &result.backends_used {
            let strategy = strategies.entry(selection.kind).or_insert_with(|| AdaptiveStrategy::new(selection.kind));
            let performance = AdaptiveStrategy::performance(result.confidence, meta.quality, strategy.adaptation_rate);
            strategy.record_performance(performance);
        }
    }

    pub async fn solve(&self, problem: &str, context: &HashMap<String, serde_json::Value>) -> Result<ReasoningResult> {
        self.reason_with(problem, context, IntentOverride { problem_solving: true, ..Default::default() }).await
    }

    pub async fn infer(&self, premises: &[String], context: &HashMap<String, serde_json::Value>) -> Result<ReasoningResult> {
        let joined = premises.join("; ");
        self.reason_with(&joined, context, IntentOverride { inference: true, ..Default::default() }).await
    }

    pub async fn decide(&self, options: &[String], context: &HashMap<String, serde_json::Value>) -> Result<Decision> {
        if options.is_empty() {
            return Ok(Decision { chosen: String::new(), reasoning: ReasoningResult::invalid_input("no options provided") });
        }
        let joined = format!("decide among options: {}", options.join(", "));
        let reasoning = self.reason_with(&joined, context, IntentOverride { decision: true, ..Default::default() }).await?;

        let mut best = options[0].clone();
        let mut best_score = -1.0;
        for option in options {
            let score = option.split_whitespace().count() as f64 + self.word_splitter.split(option).count() as f64 * 0.01;
            if score > best_score {
                best_score = score;
                best = option.clone();
            }
        }
        Ok(Decision { chosen: best, reasoning })
    }

    pub async fn process_task(&self, task: &str, context: &HashMap<String, serde_json::Value>) -> Result<TaskResult> {
        Ok(TaskResult { result: self.reason(task, context).await? })
    }
}

pub type StrategyId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }

    fn engine() -> ReasoningEngine {
        ReasoningEngine::new(ReasoningConfig::default(), 8, Arc::new(RwLock::new(ConsciousnessState::default())))
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let engine = engine();
        let result = engine.reason("", &ctx()).await.unwrap();
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.conclusions.len(), 1);
    }

    #[tokio::test]
    async fn reason_selects_classical_by_default() {
        let engine = engine();
        let result = engine.reason("the sky is blue", &ctx()).await.unwrap();
        assert!(result.backends_used.iter().any(|b| b.kind == BackendKind::Classical));
        let sum: f64 = result.backends_used.iter().map(|b| b.weight).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn problem_solving_intent_triggers_backend() {
        let engine = engine();
        let result = engine.solve("please solve this puzzle", &ctx()).await.unwrap();
        assert!(result.backends_used.iter().any(|b| b.kind == BackendKind::ProblemSolver));
    }

    #[tokio::test]
    async fn decide_picks_one_of_the_options() {
        let engine = engine();
        let options = vec!["option a".to_string(), "a much longer option b".to_string()];
        let decision = engine.decide(&options, &ctx()).await.unwrap();
        assert!(options.contains(&decision.chosen));
    }

    #[tokio::test]
    async fn adaptive_strategy_accumulates_after_repeated_calls() {
        let engine = engine();
        for _ in 0..3 {
            engine.reason("the sky is blue", &ctx()).await.unwrap();
        }
        let strategies = engine.strategy_snapshot().await;
        let classical = strategies.iter().find(|s| s.id == BackendKind::Classical).unwrap();
        assert!(classical.history.len() >= 1 && classical.history.len() <= 10);
    }
}
