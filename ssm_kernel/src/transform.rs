/// SSM Kernel v1 — Alignment Transform
///
/// Stateless mapping between bounded posture space (-1, 1) and the
/// unbounded accumulation space. Clamp first, then atanh.

/// Posture clamp margin. Keeps atanh away from its poles at ±1.
pub const EPS_A: f64 = 1e-6;

/// Weight floor used as divisor when all weight so far is neutral.
pub const EPS_W: f64 = 1e-9;

/// Lower posture bound after clamping.
pub const CLAMP_MIN: f64 = -1.0 + EPS_A;

/// Upper posture bound after clamping.
pub const CLAMP_MAX: f64 = 1.0 - EPS_A;

/// Clamp `x` into `[lo, hi]`.
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// Clamp a raw posture value into `[CLAMP_MIN, CLAMP_MAX]`.
pub fn clamp_posture(a_raw: f64) -> f64 {
    clamp(a_raw, CLAMP_MIN, CLAMP_MAX)
}

/// Posture space → accumulation space: `atanh(clamp(a_raw))`.
pub fn forward(a_raw: f64) -> f64 {
    clamp_posture(a_raw).atanh()
}

/// Accumulation space → posture space: `tanh(u)`.
pub fn inverse(u: f64) -> f64 {
    u.tanh()
}

/// Weighted mean in accumulation space, mapped back to posture space.
/// `tanh(U / max(W, EPS_W))`
pub fn weighted_posture(u_sum: f64, w_sum: f64) -> f64 {
    inverse(u_sum / w_sum.max(EPS_W))
}
