//! Consciousness state: a bounded scalar/vector record used to modulate
//! reasoning parameters. Not a claim of sentience — a numeric state mutated
//! only by the orchestrator after each reasoning + learning cycle.

use cortex_types::clamp;
use serde::{Deserialize, Serialize};

/// A single entry in the bounded superposition history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SuperpositionState {
    pub amplitude: f64,
    pub phase: f64,
    pub coherence: f64,
}

/// Maximum number of retained superposition states; oldest entries are
/// truncated FIFO.
pub const MAX_SUPERPOSITION: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsciousnessState {
    pub level: f64,
    pub awareness: f64,
    pub attention_capacity: f64,
    pub plasticity: f64,
    pub adaptation: f64,
    pub quantum_factor: f64,
    pub superposition: Vec<SuperpositionState>,
}

impl Default for ConsciousnessState {
    fn default() -> Self {
        Self {
            level: 0.5,
            awareness: 0.5,
            attention_capacity: 0.5,
            plasticity: 0.5,
            adaptation: 0.5,
            quantum_factor: 0.5,
            superposition: Vec::new(),
        }
    }
}

impl ConsciousnessState {
    /// Apply the per-cycle modulation rule from a completed reasoning
    /// confidence. `adaptation` moves at half the rate of `plasticity`.
    pub fn update_from_confidence(&mut self, confidence: f64) {
        self.plasticity = clamp(self.plasticity + (confidence - 0.5) * 0.1, 0.1, 1.0);
        self.adaptation = clamp(self.adaptation + (confidence - 0.5) * 0.05, 0.1, 1.0);
    }

    /// Append a superposition state, truncating the oldest entry if the
    /// bound is exceeded.
    pub fn push_superposition(&mut self, state: SuperpositionState) {
        self.superposition.push(state);
        if self.superposition.len() > MAX_SUPERPOSITION {
            self.superposition.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_from_confidence_moves_plasticity_and_adaptation() {
        let mut state = ConsciousnessState::default();
        state.update_from_confidence(0.9);
        assert!((state.plasticity - 0.54).abs() < 1e-9);
        assert!((state.adaptation - 0.52).abs() < 1e-9);
    }

    #[test]
    fn plasticity_and_adaptation_stay_bounded() {
        let mut state = ConsciousnessState::default();
        for _ in 0..100 {
            state.update_from_confidence(1.0);
        }
        assert!(state.plasticity <= 1.0);
        assert!(state.adaptation <= 1.0);
    }

    #[test]
    fn superposition_truncates_fifo() {
        let mut state = ConsciousnessState::default();
        for i in 0..(MAX_SUPERPOSITION + 10) {
            state.push_superposition(SuperpositionState {
                amplitude: 1.0,
                phase: i as f64,
                coherence: 1.0,
            });
        }
        assert_eq!(state.superposition.len(), MAX_SUPERPOSITION);
        assert_eq!(state.superposition[0].phase, 10.0);
    }
}
