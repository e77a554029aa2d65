//! Cortex cognitive architecture: wires the pure domain logic in
//! `cortex-core` and the in-memory repositories in `cortex-infra` into a
//! concrete reasoning engine, learning engine, and top-level orchestrator.

pub mod learning;
pub mod orchestrator;
pub mod reasoning;

pub use learning::{LearningEngine, LearningEngineState, PatternMiner};
pub use orchestrator::{ActionResult, LifecycleState, Orchestrator, SystemMetrics, SystemStatus};
pub use reasoning::{analyze_requirements, Decision, HeuristicBackend, ReasoningEngine, TaskResult};
