/// SSM Kernel v1 — Centralized Scope Transition
///
/// ALL accumulator mutation logic lives here.
/// The input state is never mutated; a copy is updated and returned
/// together with the emitted per-scope output.

use crate::domain::ScopeOutput;
use crate::events::Envelope;
use crate::quero::update_quero;
use crate::state::AccumulatorState;
use crate::transform::{forward, weighted_posture};
use crate::zeta::{apply_neutral, is_zeta_zero};

/// Apply *env* to one scope *state* and return `(new_state, output)`.
///
/// Order inside the step is fixed:
///   1. ZETA-0 branch or weighted accumulation
///   2. a_out from the updated U/W
///   3. q_out from the updated a_out and the pre-update prev_a
///   4. prev_a / prev_q advanced on the returned state
pub fn apply_envelope(
    state: &AccumulatorState,
    env: &Envelope,
) -> (AccumulatorState, ScopeOutput) {
    let mut next = *state;

    let neutral = is_zeta_zero(env);
    if neutral {
        apply_neutral(&mut next, env.weight);
    } else {
        next.u += env.weight * forward(env.a_raw);
        next.w += env.weight;
    }

    let a_out = weighted_posture(next.u, next.w);
    let q_out = update_quero(state.prev_q, a_out, state.prev_a);

    next.prev_a = a_out;
    next.prev_q = q_out;

    (next, ScopeOutput { a_out, q_out, neutral })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_initial_state;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_input_state_untouched() {
        let s = create_initial_state();
        let (next, _) = apply_envelope(&s, &Envelope::on_main(1, 0.5, 1.0));
        assert_eq!(s, AccumulatorState::default());
        assert!(next.w > 0.0);
    }

    #[test]
    fn test_first_envelope_sets_alignment() {
        let (next, out) = apply_envelope(&create_initial_state(), &Envelope::on_main(1, 0.5, 2.0));
        assert!(close(out.a_out, 0.5));
        assert!(close(out.q_out, 0.5));
        assert!(!out.neutral);
        assert_eq!(next.w, 2.0);
        assert_eq!(next.prev_a, out.a_out);
        assert_eq!(next.prev_q, out.q_out);
    }

    #[test]
    fn test_weighted_average_in_transform_space() {
        let s = create_initial_state();
        let (s, _) = apply_envelope(&s, &Envelope::on_main(1, 0.6, 3.0));
        let (_, out) = apply_envelope(&s, &Envelope::on_main(2, -0.2, 1.0));
        let expected = ((3.0 * 0.6f64.atanh() + (-0.2f64).atanh()) / 4.0).tanh();
        assert!(close(out.a_out, expected));
    }

    #[test]
    fn test_neutral_branch() {
        let s = create_initial_state();
        let (s, _) = apply_envelope(&s, &Envelope::on_main(1, 0.5, 1.0));
        let (next, out) = apply_envelope(&s, &Envelope::on_main(2, 0.0, 0.0));
        assert!(out.neutral);
        assert_eq!(next.u, s.u);
        assert_eq!(next.w, s.w);
        assert!(close(out.a_out, 0.5));
        assert!(close(out.q_out, 0.0));
    }

    #[test]
    fn test_zero_weight_nonzero_posture_is_not_neutral() {
        let (next, out) = apply_envelope(&create_initial_state(), &Envelope::on_main(1, 0.3, 0.0));
        assert!(!out.neutral);
        assert_eq!(next.u, 0.0);
        assert_eq!(out.a_out, 0.0);
    }
}
