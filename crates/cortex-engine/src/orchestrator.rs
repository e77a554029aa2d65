//! Top-level lifecycle and synthesis: wires the reasoning engine, learning
//! engine, memory manager, knowledge base, and consciousness state into a
//! single bounded, cancellable entry point.

use crate::learning::LearningEngine;
use crate::reasoning::ReasoningEngine;
use chrono::Utc;
use cortex_core::consciousness::{ConsciousnessState, SuperpositionState};
use cortex_core::knowledge::KnowledgeRepository;
use cortex_core::learning::{Action, Experience, Feedback, Outcome};
use cortex_core::memory::{MemoryRepository, MemoryStats};
use cortex_core::reasoning::ReasoningResult;
use cortex_types::{clamp01, CortexConfig, CortexError, FeedbackType, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SystemStatus {
    pub lifecycle: String,
    pub memory: MemoryStats,
    pub knowledge_count: usize,
}

#[derive(Debug, Clone)]
pub struct SystemMetrics {
    pub memory: MemoryStats,
    pub knowledge_count: usize,
    pub reasoning_strategies_tracked: usize,
    pub learning_history_len: usize,
}

#[derive(Debug, Clone)]
pub struct ActionResult {
    pub success: bool,
    pub reasoning: ReasoningResult,
}

pub struct Orchestrator {
    state: Arc<RwLock<LifecycleState>>,
    config: CortexConfig,
    reasoning: ReasoningEngine,
    learning: LearningEngine,
    memory: Arc<dyn MemoryRepository>,
    knowledge: Arc<dyn KnowledgeRepository>,
    consciousness: Arc<RwLock<ConsciousnessState>>,
    fanout: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(config: CortexConfig, memory: Arc<dyn MemoryRepository>, knowledge: Arc<dyn KnowledgeRepository>) -> Self {
        let consciousness = Arc::new(RwLock::new(ConsciousnessState::default()));
        let reasoning = ReasoningEngine::new(config.reasoning.clone(), config.orchestrator.fanout_max, consciousness.clone());
        let learning = LearningEngine::new(config.learning.clone(), knowledge.clone());
        let fanout = Arc::new(Semaphore::new(config.orchestrator.fanout_max.max(1)));
        Self {
            state: Arc::new(RwLock::new(LifecycleState::Uninitialized)),
            config,
            reasoning,
            learning,
            memory,
            knowledge,
            consciousness,
            fanout,
        }
    }

    async fn transition(&self, expected: &[LifecycleState], next: LifecycleState) -> Result<()> {
        let mut state = self.state.write().await;
        if !expected.contains(&*state) {
            return Err(CortexError::LifecycleViolation(format!(
                "cannot move from {:?} to {:?}",
                *state, next
            )));
        }
        *state = next;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        self.config.validate()?;
        self.transition(&[LifecycleState::Uninitialized], LifecycleState::Initialized).await
    }

    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        self.transition(&[LifecycleState::Initialized, LifecycleState::Stopped], LifecycleState::Running).await
    }

    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        self.transition(&[LifecycleState::Running, LifecycleState::Initialized], LifecycleState::Stopped).await
    }

    async fn require_running(&self) -> Result<()> {
        if *self.state.read().await != LifecycleState::Running {
            return Err(CortexError::LifecycleViolation("orchestrator is not running".into()));
        }
        Ok(())
    }

    /// Reason over `input`, feed the result into the learning engine, and
    /// update consciousness state. Learning failures are logged and tolerated
    /// rather than propagated: a reasoning result is still useful on its own.
    #[instrument(skip(self, context, cancel))]
    pub async fn process_input(
        &self,
        input: &str,
        context: HashMap<String, serde_json::Value>,
        cancel: CancellationToken,
    ) -> Result<ReasoningResult> {
        self.require_running().await?;
        let _permit = self.fanout.acquire().await.map_err(|_| CortexError::Other("fan-out semaphore closed".into()))?;

        let duration = std::time::Duration::from_millis(self.config.orchestrator.request_timeout_ms);
        let reasoning_result = tokio::select! {
            result = timeout(duration, self.reasoning.reason(input, &context)) => {
                match result {
                    Ok(inner) => inner?,
                    Err(_) => return Err(CortexError::DeadlineExceeded),
                }
            }
            _ = cancel.cancelled() => return Err(CortexError::Cancelled),
        };

        self.feed_learning(input, &context, &reasoning_result).await;

        {
            let mut state = self.consciousness.write().await;
            state.update_from_confidence(reasoning_result.confidence);
            if let Some(q) = &reasoning_result.quantum {
                state.push_superposition(SuperpositionState { amplitude: q.amplitude, phase: q.phase, coherence: q.coherence });
            }
        }

        Ok(reasoning_result)
    }

    async fn feed_learning(&self, input: &str, context: &HashMap<String, serde_json::Value>, result: &ReasoningResult) {
        let experience = Experience::new(
            context.clone(),
            Action { kind: "process_input".to_string(), effects: vec![input.to_string()] },
            Outcome {
                state: serde_json::json!({ "confidence": result.confidence }),
                value: result.confidence,
                changes: result.conclusions.iter().map(|c| c.statement.clone()).collect(),
            },
            Feedback {
                feedback_type: if result.confidence >= 0.5 { FeedbackType::Positive } else { FeedbackType::Negative },
                strength: clamp01(result.confidence),
            },
        );
        if let Err(err) = self.learning.learn(experience).await {
            warn!(error = %err, "learning pass failed for a reasoning cycle; continuing with reasoning result only");
        }
    }

    pub async fn execute_plan(&self, plan: &str, context: HashMap<String, serde_json::Value>) -> Result<ActionResult> {
        self.require_running().await?;
        let reasoning = self.reasoning.solve(plan, &context).await?;
        Ok(ActionResult { success: reasoning.confidence > 0.0, reasoning })
    }

    pub async fn learn(&self, experience: Experience) -> Result<cortex_core::learning::LearningResult> {
        self.require_running().await?;
        self.learning.learn(experience).await
    }

    pub async fn get_status(&self) -> Result<SystemStatus> {
        let state = *self.state.read().await;
        let lifecycle = match state {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
        };
        Ok(SystemStatus {
            lifecycle: lifecycle.to_string(),
            memory: self.memory.stats(None).await?,
            knowledge_count: self.knowledge.len().await?,
        })
    }

    pub async fn get_metrics(&self) -> Result<SystemMetrics> {
        Ok(SystemMetrics {
            memory: self.memory.stats(None).await?,
            knowledge_count: self.knowledge.len().await?,
            reasoning_strategies_tracked: self.reasoning.strategy_snapshot().await.len(),
            learning_history_len: self.learning.state().await.history_len,
        })
    }

    /// Always succeeds: stops accepting new work and marks the orchestrator
    /// stopped, regardless of the state it was in.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = LifecycleState::Stopped;
        info!("orchestrator shut down");
        Ok(())
    }

    /// Wipe the knowledge base and memory manager and return to
    /// `Uninitialized`. Only valid from `Running` or `Stopped`, same as every
    /// other lifecycle transition.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<()> {
        self.transition(&[LifecycleState::Running, LifecycleState::Stopped], LifecycleState::Uninitialized).await?;
        self.knowledge.clear().await?;
        self.memory.clear(None).await?;
        *self.consciousness.write().await = ConsciousnessState::default();
        Ok(())
    }

    pub fn reasoning_engine(&self) -> &ReasoningEngine {
        &self.reasoning
    }

    pub fn learning_engine(&self) -> &LearningEngine {
        &self.learning
    }

    pub async fn consciousness_snapshot(&self) -> ConsciousnessState {
        self.consciousness.read().await.clone()
    }

    pub fn now() -> chrono::DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_infra::{InMemoryKnowledgeBase, InMemoryMemoryManager};

    fn orchestrator() -> Orchestrator {
        let config = CortexConfig::default();
        let memory = Arc::new(InMemoryMemoryManager::new(config.memory.clone()));
        let knowledge = Arc::new(InMemoryKnowledgeBase::new());
        Orchestrator::new(config, memory, knowledge)
    }

    #[tokio::test]
    async fn lifecycle_requires_initialize_before_start() {
        let orchestrator = orchestrator();
        assert!(orchestrator.start().await.is_err());
        orchestrator.initialize().await.unwrap();
        orchestrator.start().await.unwrap();
    }

    #[tokio::test]
    async fn process_input_requires_running() {
        let orchestrator = orchestrator();
        let result = orchestrator.process_input("hello", HashMap::new(), CancellationToken::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn process_input_updates_consciousness_and_learns() {
        let orchestrator = orchestrator();
        orchestrator.initialize().await.unwrap();
        orchestrator.start().await.unwrap();

        let result = orchestrator.process_input("the sky is blue", HashMap::new(), CancellationToken::new()).await.unwrap();
        assert!(result.confidence >= 0.0);

        let metrics = orchestrator.get_metrics().await.unwrap();
        assert_eq!(metrics.learning_history_len, 1);
    }

    #[tokio::test]
    async fn cancellation_short_circuits_process_input() {
        let orchestrator = orchestrator();
        orchestrator.initialize().await.unwrap();
        orchestrator.start().await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = orchestrator.process_input("anything", HashMap::new(), cancel).await;
        assert!(matches!(result, Err(CortexError::Cancelled)));
    }

    #[tokio::test]
    async fn reset_clears_state_and_requires_reinitialize() {
        let orchestrator = orchestrator();
        orchestrator.initialize().await.unwrap();
        orchestrator.start().await.unwrap();
        orchestrator.process_input("the sky is blue", HashMap::new(), CancellationToken::new()).await.unwrap();

        orchestrator.reset().await.unwrap();
        assert!(orchestrator.start().await.is_err());
        let status = orchestrator.get_status().await.unwrap();
        assert_eq!(status.lifecycle, "uninitialized");
    }

    #[tokio::test]
    async fn shutdown_always_succeeds() {
        let orchestrator = orchestrator();
        orchestrator.shutdown().await.unwrap();
        let status = orchestrator.get_status().await.unwrap();
        assert_eq!(status.lifecycle, "stopped");
    }
}
