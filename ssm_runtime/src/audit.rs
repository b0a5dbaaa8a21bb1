//! Audit — determinism verification, chain verification and replay comparison.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use ssm_kernel::events::Envelope;
use ssm_kernel::hashing::{verify_chain, ChainVerification, LinkMismatch};
use ssm_kernel::{HashLink, KernelError, ReplayOutput};

use crate::replay;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("DETERMINISM FAILURE: two replays produced different chains (run 1 head {run1}, run 2 head {run2})")]
    Nondeterministic { run1: String, run2: String },

    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// A recorded chain that does not match the candidate envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityViolation {
    /// Earliest divergent link, if any link diverged.
    pub first: Option<LinkMismatch>,
    pub mismatch_count: usize,
    pub candidate_len: usize,
    pub recorded_len: usize,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.first {
            Some(m) => write!(
                f,
                "integrity violation: first divergent link at position {} (seq {}): expected {}, recorded {}; {} link(s) diverge",
                m.position, m.sequence_number, m.expected, m.recorded, self.mismatch_count
            )?,
            None => write!(f, "integrity violation")?,
        }
        if self.candidate_len != self.recorded_len {
            write!(
                f,
                "; chain length mismatch: {} envelopes vs {} recorded links",
                self.candidate_len, self.recorded_len
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for IntegrityViolation {}

/// Replay the same envelopes twice and require identical chains.
/// Returns the shared chain head.
pub fn verify_determinism(envelopes: &[Envelope]) -> Result<String, AuditError> {
    let run1 = replay::rebuild(envelopes)?;
    let run2 = replay::rebuild(envelopes)?;

    let head1 = run1.chain_head().unwrap_or_default().to_string();
    let head2 = run2.chain_head().unwrap_or_default().to_string();
    if run1 != run2 {
        return Err(AuditError::Nondeterministic {
            run1: head1,
            run2: head2,
        });
    }
    info!(head = %head1, "determinism verified");
    Ok(head1)
}

/// Verify a recorded chain against candidate envelopes.
///
/// Every link is checked; the error names the first divergent one.
pub fn verify_recorded_chain(
    envelopes: &[Envelope],
    recorded: &[HashLink],
) -> Result<ChainVerification, IntegrityViolation> {
    let verification = verify_chain(envelopes, recorded);
    if verification.is_valid() {
        info!(links = verification.checked, "hash chain verified");
        return Ok(verification);
    }

    for m in &verification.mismatches {
        warn!(
            position = m.position,
            seq = m.sequence_number,
            expected = %m.expected,
            recorded = %m.recorded,
            "hash link diverges"
        );
    }
    Err(IntegrityViolation {
        first: verification.first_divergence().cloned(),
        mismatch_count: verification.mismatches.len(),
        candidate_len: verification.candidate_len,
        recorded_len: verification.recorded_len,
    })
}

/// Structured comparison of two replays.
///
/// Returns a DivergenceReport with final-value deltas and thread
/// lifecycle differences.
pub fn compare_replays(a: &ReplayOutput, b: &ReplayOutput) -> DivergenceReport {
    let ids_a: BTreeSet<&str> = a.thread_traces.iter().map(|t| t.thread_id.as_str()).collect();
    let ids_b: BTreeSet<&str> = b.thread_traces.iter().map(|t| t.thread_id.as_str()).collect();

    let added_threads: Vec<String> = ids_b.difference(&ids_a).map(|s| s.to_string()).collect();
    let removed_threads: Vec<String> = ids_a.difference(&ids_b).map(|s| s.to_string()).collect();

    let final_a = a.final_global().map(|r| (r.a_out, r.q_out)).unwrap_or((0.0, 0.0));
    let final_b = b.final_global().map(|r| (r.a_out, r.q_out)).unwrap_or((0.0, 0.0));

    // Threads present in both whose final alignment differs.
    let mut shifted_threads = Vec::new();
    for tid in ids_a.intersection(&ids_b) {
        let last_a = a.thread(tid).and_then(|t| t.records.last()).map(|r| r.a_out);
        let last_b = b.thread(tid).and_then(|t| t.records.last()).map(|r| r.a_out);
        if last_a != last_b {
            shifted_threads.push(tid.to_string());
        }
    }

    let first_chain_divergence = a
        .hash_chain
        .iter()
        .zip(b.hash_chain.iter())
        .position(|(x, y)| x != y)
        .or_else(|| {
            (a.hash_chain.len() != b.hash_chain.len())
                .then(|| a.hash_chain.len().min(b.hash_chain.len()))
        });

    DivergenceReport {
        envelope_count_a: a.global_trace.len(),
        envelope_count_b: b.global_trace.len(),
        thread_count_a: ids_a.len(),
        thread_count_b: ids_b.len(),
        final_a_out_a: final_a.0,
        final_a_out_b: final_b.0,
        final_a_out_delta: final_b.0 - final_a.0,
        final_q_out_a: final_a.1,
        final_q_out_b: final_b.1,
        final_q_out_delta: final_b.1 - final_a.1,
        added_threads,
        removed_threads,
        shifted_threads,
        first_chain_divergence,
    }
}

/// Structured divergence report between two replays.
#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceReport {
    pub envelope_count_a: usize,
    pub envelope_count_b: usize,
    pub thread_count_a: usize,
    pub thread_count_b: usize,
    pub final_a_out_a: f64,
    pub final_a_out_b: f64,
    pub final_a_out_delta: f64,
    pub final_q_out_a: f64,
    pub final_q_out_b: f64,
    pub final_q_out_delta: f64,
    pub added_threads: Vec<String>,
    pub removed_threads: Vec<String>,
    pub shifted_threads: Vec<String>,
    /// Position of the first differing link (or where one chain ends early).
    pub first_chain_divergence: Option<usize>,
}

impl DivergenceReport {
    pub fn is_identical(&self) -> bool {
        self.first_chain_divergence.is_none()
            && self.added_threads.is_empty()
            && self.removed_threads.is_empty()
            && self.shifted_threads.is_empty()
            && self.final_a_out_delta == 0.0
            && self.final_q_out_delta == 0.0
    }
}
