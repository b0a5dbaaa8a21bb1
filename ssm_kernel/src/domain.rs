/// SSM Kernel v1 — Output Types
///
/// Pure data. Immutable snapshots emitted by the kernel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Accumulation context a trace record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "thread_id", rename_all = "snake_case")]
pub enum Scope {
    Global,
    Thread(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "<global>"),
            Scope::Thread(id) => write!(f, "{}", id),
        }
    }
}

/// Per-scope outcome of one envelope update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScopeOutput {
    pub a_out: f64,
    pub q_out: f64,
    /// True when the envelope was handled by the ZETA-0 branch.
    pub neutral: bool,
}

/// Snapshot emitted once per envelope per scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub sequence_number: i64,
    pub scope: Scope,
    /// Thread the envelope was tagged with (also set on global records).
    pub thread_id: String,
    pub a_raw: f64,
    pub weight: f64,
    pub a_out: f64,
    pub q_out: f64,
}

/// One link of the tamper-evident chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashLink {
    pub sequence_number: i64,
    pub hash_value: String,
}

/// Ordered trace of one thread scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadTrace {
    pub thread_id: String,
    pub records: Vec<TraceRecord>,
}

/// Complete output of one replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayOutput {
    pub global_trace: Vec<TraceRecord>,
    /// Per-thread traces in first-seen order.
    pub thread_traces: Vec<ThreadTrace>,
    pub hash_chain: Vec<HashLink>,
}

impl ReplayOutput {
    pub fn thread(&self, thread_id: &str) -> Option<&ThreadTrace> {
        self.thread_traces.iter().find(|t| t.thread_id == thread_id)
    }

    /// Last global record, if any envelope was processed.
    pub fn final_global(&self) -> Option<&TraceRecord> {
        self.global_trace.last()
    }

    /// Digest of the last link, if any.
    pub fn chain_head(&self) -> Option<&str> {
        self.hash_chain.last().map(|l| l.hash_value.as_str())
    }
}

/// Everything emitted for a single envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub global: TraceRecord,
    pub thread: TraceRecord,
    pub link: HashLink,
}
