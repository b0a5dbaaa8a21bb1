/// SSM Kernel v1 — Accumulator State
///
/// One instance per scope: the global scope plus one per thread.
/// Pure data; all mutation goes through `transitions`.

use serde::{Deserialize, Serialize};

/// Running weighted-sum state of a single scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorState {
    /// Cumulative weighted value in accumulation space.
    pub u: f64,
    /// Cumulative weight. Never decreases.
    pub w: f64,
    /// Last emitted alignment (posture space).
    pub prev_a: f64,
    /// Last emitted drift. Stored, not read by the current drift policy.
    pub prev_q: f64,
}

/// Create a fresh, all-zero scope state.
pub fn create_initial_state() -> AccumulatorState {
    AccumulatorState::default()
}
