/// SSM Kernel v1 — Invariant Checks
///
/// Run on every emitted record. Returns `Err` on the first failure.

use crate::domain::TraceRecord;
use crate::error::{KernelError, KernelResult};
use crate::state::AccumulatorState;
use crate::transform::{CLAMP_MAX, CLAMP_MIN};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Validate one emitted record against the state it was derived from.
pub fn validate_step(
    record: &TraceRecord,
    before: &AccumulatorState,
    after: &AccumulatorState,
) -> KernelResult<()> {
    check_alignment_bounded(record)?;
    check_drift_bounded(record)?;
    check_weight_monotonic(record, before, after)?;
    check_accumulator_finite(record, after)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

/// INV-1: a_out lies strictly inside (-1, 1).
fn check_alignment_bounded(record: &TraceRecord) -> KernelResult<()> {
    if !(record.a_out.is_finite() && record.a_out > -1.0 && record.a_out < 1.0) {
        return Err(KernelError::Invariant {
            invariant: "alignment_bounded",
            detail: format!(
                "seq={} scope={} a_out={} outside (-1, 1)",
                record.sequence_number, record.scope, record.a_out
            ),
        });
    }
    Ok(())
}

/// INV-2: q_out lies inside [CLAMP_MIN, CLAMP_MAX].
fn check_drift_bounded(record: &TraceRecord) -> KernelResult<()> {
    if !(record.q_out >= CLAMP_MIN && record.q_out <= CLAMP_MAX) {
        return Err(KernelError::Invariant {
            invariant: "drift_bounded",
            detail: format!(
                "seq={} scope={} q_out={} outside [{}, {}]",
                record.sequence_number, record.scope, record.q_out, CLAMP_MIN, CLAMP_MAX
            ),
        });
    }
    Ok(())
}

/// INV-3: cumulative weight never decreases.
fn check_weight_monotonic(
    record: &TraceRecord,
    before: &AccumulatorState,
    after: &AccumulatorState,
) -> KernelResult<()> {
    if !(after.w >= before.w) {
        return Err(KernelError::Invariant {
            invariant: "weight_monotonic",
            detail: format!(
                "seq={} scope={} W went from {} to {}",
                record.sequence_number, record.scope, before.w, after.w
            ),
        });
    }
    Ok(())
}

/// INV-4: U and W stay finite. An overflowed W would silently drag
/// a_out to zero.
fn check_accumulator_finite(record: &TraceRecord, after: &AccumulatorState) -> KernelResult<()> {
    if !(after.u.is_finite() && after.w.is_finite()) {
        return Err(KernelError::Invariant {
            invariant: "accumulator_finite",
            detail: format!(
                "seq={} scope={} U={} W={} overflowed",
                record.sequence_number, record.scope, after.u, after.w
            ),
        });
    }
    Ok(())
}
