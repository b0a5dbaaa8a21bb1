/// SSM Kernel v1 — Alignment Kernel
///
/// Top-level orchestrator. Folds an ordered envelope sequence through
/// the scope transitions, validates every emitted record, and appends
/// one hash link per envelope.
///
/// Ordering contract: the global scope and the hash chain are updated
/// strictly in processing order, one envelope at a time. Per-thread
/// states are independent of each other, but this fold still touches
/// them in the same order so every replay is reproducible bit for bit.
/// Sorting is the loader's job; the kernel processes what it is given.

use tracing::{debug, warn};

use crate::domain::{ReplayOutput, Scope, ScopeOutput, StepOutput, ThreadTrace, TraceRecord};
use crate::error::KernelResult;
use crate::events::Envelope;
use crate::hashing::HashChain;
use crate::invariants::validate_step;
use crate::registry::ThreadRegistry;
use crate::state::{create_initial_state, AccumulatorState};
use crate::transitions::apply_envelope as transition_apply;

/// Stateful kernel owning the global scope, the thread registry and the chain.
#[derive(Debug, Clone)]
pub struct AlignmentKernel {
    global: AccumulatorState,
    registry: ThreadRegistry,
    chain: HashChain,
    global_trace: Vec<TraceRecord>,
    thread_traces: Vec<ThreadTrace>,
    last_sequence: Option<i64>,
}

impl Default for AlignmentKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignmentKernel {
    /// Create a kernel with empty global state, registry and chain.
    pub fn new() -> Self {
        Self {
            global: create_initial_state(),
            registry: ThreadRegistry::new(),
            chain: HashChain::new(),
            global_trace: Vec::new(),
            thread_traces: Vec::new(),
            last_sequence: None,
        }
    }

    /// Process a single envelope:
    ///   1. Look up the thread scope (a new thread starts all-zero)
    ///   2. Transition thread and global scopes from their pre-step states
    ///   3. Validate both emitted records
    ///   4. Register the thread if new and append the hash link
    ///   5. Commit both scope states and record the traces
    ///
    /// On error nothing is committed: no state, no link, no thread.
    pub fn apply_envelope(&mut self, env: &Envelope) -> KernelResult<StepOutput> {
        if let Some(last) = self.last_sequence {
            if env.sequence_number <= last {
                warn!(
                    last,
                    seq = env.sequence_number,
                    "sequence_number not increasing; processing in given order"
                );
            }
        }

        let existing = self.registry.handle(&env.thread_id);
        let thread_before = existing
            .map(|h| *self.registry.state(h))
            .unwrap_or_else(create_initial_state);
        let global_before = self.global;

        let (thread_after, thread_out) = transition_apply(&thread_before, env);
        let (global_after, global_out) = transition_apply(&global_before, env);

        let thread_record = make_record(env, Scope::Thread(env.thread_id.clone()), &thread_out);
        let global_record = make_record(env, Scope::Global, &global_out);
        validate_step(&thread_record, &thread_before, &thread_after)?;
        validate_step(&global_record, &global_before, &global_after)?;

        // Validated: register a new thread only now.
        let handle = self.registry.get_or_create(&env.thread_id);
        let link = self.chain.append(env);

        *self.registry.state_mut(handle) = thread_after;
        self.global = global_after;
        self.last_sequence = Some(env.sequence_number);

        if existing.is_none() {
            self.thread_traces.push(ThreadTrace {
                thread_id: env.thread_id.clone(),
                records: Vec::new(),
            });
        }
        self.thread_traces[handle.index()]
            .records
            .push(thread_record.clone());
        self.global_trace.push(global_record.clone());

        debug!(
            seq = env.sequence_number,
            thread = %env.thread_id,
            neutral = global_out.neutral,
            a_out = global_out.a_out,
            q_out = global_out.q_out,
            hash = %link.hash_value,
            "envelope applied"
        );

        Ok(StepOutput {
            global: global_record,
            thread: thread_record,
            link,
        })
    }

    /// Apply an ordered sequence of envelopes. Stops at the first error.
    pub fn apply_sequence(&mut self, envelopes: &[Envelope]) -> KernelResult<()> {
        for env in envelopes {
            self.apply_envelope(env)?;
        }
        Ok(())
    }

    /// Fresh kernel, full fold, collected output. No partial output on error.
    pub fn replay(envelopes: &[Envelope]) -> KernelResult<ReplayOutput> {
        let mut kernel = Self::new();
        kernel.apply_sequence(envelopes)?;
        Ok(kernel.into_output())
    }

    /// Consume the kernel and return its traces and chain.
    pub fn into_output(self) -> ReplayOutput {
        ReplayOutput {
            global_trace: self.global_trace,
            thread_traces: self.thread_traces,
            hash_chain: self.chain.into_links(),
        }
    }

    pub fn global_state(&self) -> &AccumulatorState {
        &self.global
    }

    /// State of a thread scope, if the thread has been seen.
    pub fn thread_state(&self, thread_id: &str) -> Option<&AccumulatorState> {
        self.registry.handle(thread_id).map(|h| self.registry.state(h))
    }

    pub fn registry(&self) -> &ThreadRegistry {
        &self.registry
    }

    pub fn chain(&self) -> &HashChain {
        &self.chain
    }

    pub fn global_trace(&self) -> &[TraceRecord] {
        &self.global_trace
    }

    pub fn thread_traces(&self) -> &[ThreadTrace] {
        &self.thread_traces
    }

    /// Number of envelopes processed so far.
    pub fn processed(&self) -> usize {
        self.global_trace.len()
    }
}

fn make_record(env: &Envelope, scope: Scope, out: &ScopeOutput) -> TraceRecord {
    TraceRecord {
        sequence_number: env.sequence_number,
        scope,
        thread_id: env.thread_id.clone(),
        a_raw: env.a_raw,
        weight: env.weight,
        a_out: out.a_out,
        q_out: out.q_out,
    }
}
