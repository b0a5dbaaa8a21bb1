/// SSM Kernel v1 — Quero Lane
///
/// Drift is the clamped first difference of a scope's alignment:
///   q_out = clamp(a_out - prev_a, CLAMP_MIN, CLAMP_MAX)
///
/// `prev_q` is accepted so smoothing variants can share the signature,
/// but the v1 policy does not read it.

use crate::transform::{clamp, CLAMP_MAX, CLAMP_MIN};

/// Compute drift for one scope from its updated alignment and its
/// pre-update previous alignment.
pub fn update_quero(_prev_q: f64, a_out: f64, prev_a: f64) -> f64 {
    let q_raw = a_out - prev_a;
    clamp(q_raw, CLAMP_MIN, CLAMP_MAX)
}
