//! Configuration types for the cortex cognitive architecture.

use serde::{Deserialize, Serialize};

/// Top-level configuration aggregate, covering every knob named in the
/// external-interfaces configuration table.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CortexConfig {
    pub reasoning: ReasoningConfig,
    pub learning: LearningConfig,
    pub memory: MemoryConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Reasoning engine configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReasoningConfig {
    /// Backends eligible for selection. Defaults to all known kinds.
    pub backends_enabled: Vec<String>,
    /// Strategy-reuse threshold: a strategy may be reselected if its
    /// `success_rate` exceeds this, or it has not been used recently.
    pub adaptive_threshold: f64,
    /// Bound on the number of superposed logic states in quantum mode.
    pub quantum_max_states: usize,
}

/// Learning engine configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LearningConfig {
    /// Ring-buffer size for experience history.
    pub history_capacity: usize,
    /// Minimum insight confidence required to convert into a knowledge entry.
    pub insight_confidence_threshold: f64,
}

/// Memory manager configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MemoryConfig {
    pub capacity_short: usize,
    pub capacity_working: usize,
    pub consolidation_similarity_threshold: f64,
    pub optimization_compression_similarity: f64,
    /// Base decay rate; tier-specific rates are derived multiples of this.
    pub base_decay_rate: f64,
}

/// Orchestrator configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrchestratorConfig {
    pub request_timeout_ms: u64,
    pub fanout_max: usize,
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            reasoning: ReasoningConfig::default(),
            learning: LearningConfig::default(),
            memory: MemoryConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            backends_enabled: vec![
                "classical",
                "fuzzy",
                "probabilistic",
                "modal",
                "temporal",
                "quantum",
                "tensor",
                "decision",
                "inference",
                "problem_solver",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            adaptive_threshold: 0.7,
            quantum_max_states: 4,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            insight_confidence_threshold: 0.5,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity_short: 1000,
            capacity_working: 100,
            consolidation_similarity_threshold: 0.7,
            optimization_compression_similarity: 0.8,
            base_decay_rate: 0.1,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            fanout_max: 8,
        }
    }
}

impl CortexConfig {
    /// Overlay environment variables on top of the defaults.
    ///
    /// Unset variables leave the corresponding field untouched.
    pub fn from_env() -> crate::error::Result<Self> {
        use crate::error::CortexError;
        use std::env;

        let mut config = Self::default();

        if let Ok(v) = env::var("CORTEX_REASONING_ADAPTIVE_THRESHOLD") {
            config.reasoning.adaptive_threshold = v
                .parse()
                .map_err(|_| CortexError::ConfigError("invalid CORTEX_REASONING_ADAPTIVE_THRESHOLD".into()))?;
        }
        if let Ok(v) = env::var("CORTEX_REASONING_QUANTUM_MAX_STATES") {
            config.reasoning.quantum_max_states = v
                .parse()
                .map_err(|_| CortexError::ConfigError("invalid CORTEX_REASONING_QUANTUM_MAX_STATES".into()))?;
        }
        if let Ok(v) = env::var("CORTEX_LEARNING_HISTORY_CAPACITY") {
            config.learning.history_capacity = v
                .parse()
                .map_err(|_| CortexError::ConfigError("invalid CORTEX_LEARNING_HISTORY_CAPACITY".into()))?;
        }
        if let Ok(v) = env::var("CORTEX_LEARNING_INSIGHT_CONFIDENCE_THRESHOLD") {
            config.learning.insight_confidence_threshold = v.parse().map_err(|_| {
                CortexError::ConfigError("invalid CORTEX_LEARNING_INSIGHT_CONFIDENCE_THRESHOLD".into())
            })?;
        }
        if let Ok(v) = env::var("CORTEX_MEMORY_CAPACITY_SHORT") {
            config.memory.capacity_short = v
                .parse()
                .map_err(|_| CortexError::ConfigError("invalid CORTEX_MEMORY_CAPACITY_SHORT".into()))?;
        }
        if let Ok(v) = env::var("CORTEX_MEMORY_CAPACITY_WORKING") {
            config.memory.capacity_working = v
                .parse()
                .map_err(|_| CortexError::ConfigError("invalid CORTEX_MEMORY_CAPACITY_WORKING".into()))?;
        }
        if let Ok(v) = env::var("CORTEX_ORCHESTRATOR_REQUEST_TIMEOUT_MS") {
            config.orchestrator.request_timeout_ms = v
                .parse()
                .map_err(|_| CortexError::ConfigError("invalid CORTEX_ORCHESTRATOR_REQUEST_TIMEOUT_MS".into()))?;
        }
        if let Ok(v) = env::var("CORTEX_ORCHESTRATOR_FANOUT_MAX") {
            config.orchestrator.fanout_max = v
                .parse()
                .map_err(|_| CortexError::ConfigError("invalid CORTEX_ORCHESTRATOR_FANOUT_MAX".into()))?;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        use crate::error::CortexError;
        let content = std::fs::read_to_string(path)
            .map_err(|e| CortexError::ConfigError(format!("failed to read config file: {}", e)))?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &str) -> crate::error::Result<()> {
        use crate::error::CortexError;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| CortexError::ConfigError(format!("failed to write config file: {}", e)))?;
        Ok(())
    }

    /// Validate range and non-empty constraints across the aggregate.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::CortexError;

        if self.reasoning.backends_enabled.is_empty() {
            return Err(CortexError::ConfigError("reasoning.backends_enabled cannot be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.reasoning.adaptive_threshold) {
            return Err(CortexError::ConfigError("reasoning.adaptive_threshold must be in [0,1]".into()));
        }
        if self.reasoning.quantum_max_states == 0 {
            return Err(CortexError::ConfigError("reasoning.quantum_max_states must be > 0".into()));
        }
        if self.learning.history_capacity == 0 {
            return Err(CortexError::ConfigError("learning.history_capacity must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.learning.insight_confidence_threshold) {
            return Err(CortexError::ConfigError("learning.insight_confidence_threshold must be in [0,1]".into()));
        }
        if self.memory.capacity_short == 0 || self.memory.capacity_working == 0 {
            return Err(CortexError::ConfigError("memory tier capacities must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.memory.consolidation_similarity_threshold) {
            return Err(CortexError::ConfigError("memory.consolidation_similarity_threshold must be in [0,1]".into()));
        }
        if !(0.0..=1.0).contains(&self.memory.optimization_compression_similarity) {
            return Err(CortexError::ConfigError("memory.optimization_compression_similarity must be in [0,1]".into()));
        }
        if self.orchestrator.request_timeout_ms == 0 {
            return Err(CortexError::ConfigError("orchestrator.request_timeout_ms must be > 0".into()));
        }
        if self.orchestrator.fanout_max == 0 {
            return Err(CortexError::ConfigError("orchestrator.fanout_max must be > 0".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(CortexConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_backend_set() {
        let mut config = CortexConfig::default();
        config.reasoning.backends_enabled.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = CortexConfig::default();
        config.reasoning.adaptive_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
