//! Text rendering of a replay: global trace, scoreboard summary, chain.
//!
//! Read-only over `ReplayOutput`. Values are shown signed with six
//! decimals; the underlying records keep full precision.

use std::fmt::Write;

use ssm_kernel::{HashLink, ReplayOutput, TraceRecord};

const RULE: &str = "----------------------------------------------------------";

/// One line per global record.
pub fn render_trace(trace: &[TraceRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- GLOBAL ALIGNMENT + QUERO TRACE -----------------------");
    for r in trace {
        let _ = writeln!(
            out,
            "seq={:<4} | thr={:<6} | a_raw={:+.3} | w={:.1} | a_out={:+.6} | q_out={:+.6}",
            r.sequence_number, r.thread_id, r.a_raw, r.weight, r.a_out, r.q_out
        );
    }
    out
}

/// Per-thread traces, one block per thread in first-seen order.
pub fn render_threads(output: &ReplayOutput) -> String {
    let mut out = String::new();
    for t in &output.thread_traces {
        let _ = writeln!(out, "--- THREAD '{}' ({} records)", t.thread_id, t.records.len());
        for r in &t.records {
            let _ = writeln!(
                out,
                "seq={:<4} | a_raw={:+.3} | w={:.1} | a_out={:+.6} | q_out={:+.6}",
                r.sequence_number, r.a_raw, r.weight, r.a_out, r.q_out
            );
        }
    }
    out
}

/// Final values per scope.
pub fn render_summary(output: &ReplayOutput) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- SCOREBOARD SUMMARY ----------------------------------");
    let _ = writeln!(out, "Total envelopes processed  : {}", output.global_trace.len());
    let _ = writeln!(out, "Total threads detected     : {}", output.thread_traces.len());

    match output.final_global() {
        Some(last) => {
            let _ = writeln!(out, "Final GLOBAL a_out         : {:+.6}", last.a_out);
            let _ = writeln!(out, "Final GLOBAL q_out         : {:+.6}", last.q_out);
        }
        None => {
            let _ = writeln!(out, "Final GLOBAL a_out         : n/a (no envelopes)");
        }
    }

    for t in &output.thread_traces {
        if let Some(last) = t.records.last() {
            let _ = writeln!(
                out,
                "Thread '{}' final a_out : {:+.6} | q_out: {:+.6}",
                t.thread_id, last.a_out, last.q_out
            );
        }
    }
    let _ = writeln!(out, "{}", RULE);
    out
}

/// One line per hash link.
pub fn render_chain(chain: &[HashLink]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- HASH CHAIN (Structural Integrity) --------------------");
    for h in chain {
        let _ = writeln!(out, "seq={:<4} | hash={}", h.sequence_number, h.hash_value);
    }
    let _ = writeln!(out, "{}", RULE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssm_kernel::engine::AlignmentKernel;
    use ssm_kernel::events::Envelope;

    fn sample() -> ReplayOutput {
        AlignmentKernel::replay(&[
            Envelope::on_main(1, 0.5, 1.0),
            Envelope::on_main(2, -0.5, 1.0),
            Envelope::on_main(3, 0.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_trace_lines() {
        let text = render_trace(&sample().global_trace);
        assert!(text.contains("seq=1    | thr=main   | a_raw=+0.500 | w=1.0 | a_out=+0.500000 | q_out=+0.500000"));
        assert!(text.contains("q_out=-0.500000"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_summary() {
        let text = render_summary(&sample());
        assert!(text.contains("Total envelopes processed  : 3"));
        assert!(text.contains("Total threads detected     : 1"));
        assert!(text.contains("Thread 'main' final a_out"));
    }

    #[test]
    fn test_summary_empty_replay() {
        let text = render_summary(&ReplayOutput::default());
        assert!(text.contains("n/a"));
    }

    #[test]
    fn test_chain_lines() {
        let out = sample();
        let text = render_chain(&out.hash_chain);
        for link in &out.hash_chain {
            assert!(text.contains(&link.hash_value));
        }
    }

    #[test]
    fn test_threads_block() {
        let text = render_threads(&sample());
        assert!(text.contains("--- THREAD 'main' (3 records)"));
    }
}
