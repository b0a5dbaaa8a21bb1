/// SSM Kernel v1 — ZETA-0 Policy
///
/// A ZETA-0 envelope declares a neutral observation: a_raw == 0 and
/// weight == 0. It adds |weight| to W and leaves U untouched, which is
/// distinct from an ordinary envelope with near-zero posture.

use crate::events::Envelope;
use crate::state::AccumulatorState;

/// True iff the envelope is a declared neutral event.
pub fn is_zeta_zero(env: &Envelope) -> bool {
    env.a_raw == 0.0 && env.weight == 0.0
}

/// Apply the neutral branch to a scope state.
pub fn apply_neutral(state: &mut AccumulatorState, weight: f64) {
    state.w += weight.abs();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(is_zeta_zero(&Envelope::on_main(1, 0.0, 0.0)));
        assert!(is_zeta_zero(&Envelope::on_main(1, -0.0, 0.0)));
        assert!(!is_zeta_zero(&Envelope::on_main(1, 0.0, 1.0)));
        assert!(!is_zeta_zero(&Envelope::on_main(1, 1e-12, 0.0)));
    }

    #[test]
    fn test_neutral_leaves_u_untouched() {
        let mut s = AccumulatorState {
            u: 0.7,
            w: 2.0,
            prev_a: 0.3,
            prev_q: 0.1,
        };
        apply_neutral(&mut s, 0.0);
        assert_eq!(s.u, 0.7);
        assert_eq!(s.w, 2.0);
    }

    #[test]
    fn test_flag_on_envelope_is_not_classification() {
        let mut env = Envelope::on_main(2, 0.4, 1.0);
        env.meta.zeta_zero = Some(serde_json::Value::Bool(true));
        assert!(!is_zeta_zero(&env));
    }
}
