/// Golden determinism test — replays the frozen envelope stream
/// and asserts the hash chain and final alignment values match the
/// permanent v1 record.
///
/// This test must NEVER be modified to match new behavior.
/// If it fails, the kernel has been broken.

use std::fs;

use serde_json::Value;

use ssm_kernel::engine::AlignmentKernel;
use ssm_kernel::events::Envelope;
use ssm_kernel::HashLink;
use ssm_kernel::KERNEL_VERSION;

fn load_envelopes(path: &str) -> Vec<Envelope> {
    let data = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));
    let arr: Vec<Value> = serde_json::from_str(&data).expect("Failed to parse envelopes JSON");
    arr.iter()
        .enumerate()
        .map(|(i, v)| Envelope::from_value(i, v).expect("golden envelope must parse"))
        .collect()
}

fn load_expected(path: &str) -> Value {
    let data = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));
    serde_json::from_str(&data).expect("Failed to parse expected JSON")
}

fn expected_chain(expected: &Value) -> Vec<HashLink> {
    serde_json::from_value(expected["chain"].clone()).expect("chain must deserialize")
}

fn assert_close(label: &str, got: f64, want: f64) {
    assert!(
        (got - want).abs() < 1e-6,
        "{}: got {}, expected {} (6-decimal golden)",
        label,
        got,
        want
    );
}

#[test]
fn golden_chain_matches() {
    let envelopes = load_envelopes("tests/golden/envelopes.json");
    let expected = load_expected("tests/golden/expected.json");

    let out = AlignmentKernel::replay(&envelopes).expect("golden replay must succeed");
    let chain = expected_chain(&expected);

    assert_eq!(out.hash_chain.len(), chain.len());
    for (i, (got, want)) in out.hash_chain.iter().zip(chain.iter()).enumerate() {
        assert_eq!(
            got, want,
            "GOLDEN TEST FAILED: hash link {} differs.\n\
             This means the kernel behavior has changed — this is forbidden.",
            i
        );
    }
}

#[test]
fn golden_final_alignment_matches() {
    let envelopes = load_envelopes("tests/golden/envelopes.json");
    let expected = load_expected("tests/golden/expected.json");
    let out = AlignmentKernel::replay(&envelopes).expect("golden replay must succeed");

    assert_eq!(
        out.global_trace.len() as u64,
        expected["envelope_count"].as_u64().unwrap()
    );

    let last = out.final_global().unwrap();
    assert_close("global a_out", last.a_out, expected["final_global"]["a_out"].as_f64().unwrap());
    assert_close("global q_out", last.q_out, expected["final_global"]["q_out"].as_f64().unwrap());

    let threads = expected["final_threads"].as_object().unwrap();
    assert_eq!(out.thread_traces.len(), threads.len());
    // First-seen order is part of the output contract.
    let order: Vec<&str> = out.thread_traces.iter().map(|t| t.thread_id.as_str()).collect();
    let expected_order: Vec<&str> = threads.keys().map(|k| k.as_str()).collect();
    assert_eq!(order, expected_order);

    for (tid, want) in threads {
        let trace = out.thread(tid).unwrap_or_else(|| panic!("missing thread {}", tid));
        assert_eq!(trace.records.len() as u64, want["records"].as_u64().unwrap());
        let last = trace.records.last().unwrap();
        assert_close(&format!("{} a_out", tid), last.a_out, want["a_out"].as_f64().unwrap());
        assert_close(&format!("{} q_out", tid), last.q_out, want["q_out"].as_f64().unwrap());
    }
}

#[test]
fn golden_replay_is_deterministic() {
    let envelopes = load_envelopes("tests/golden/envelopes.json");

    let run1 = AlignmentKernel::replay(&envelopes).unwrap();
    let run2 = AlignmentKernel::replay(&envelopes).unwrap();

    assert_eq!(
        run1.hash_chain, run2.hash_chain,
        "DETERMINISM FAILURE: two replays of the same envelopes produced different chains"
    );
    assert_eq!(run1, run2);
}

#[test]
fn kernel_version_is_one() {
    assert_eq!(KERNEL_VERSION, 1, "KERNEL_VERSION must be 1 and never change");
}
