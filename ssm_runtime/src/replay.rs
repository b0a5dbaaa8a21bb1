//! Replay orchestrator — fold an envelope stream through a fresh kernel.
//!
//! Delegates all numeric logic to the v1 kernel.
//! No shortcuts, no cached state.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use ssm_kernel::engine::AlignmentKernel;
use ssm_kernel::events::Envelope;
use ssm_kernel::hashing::GENESIS_HASH;
use ssm_kernel::{KernelError, KernelResult, ReplayOutput};

use crate::loader::{load_envelopes, LoadError, LoadedStream};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("replay aborted: {0}")]
    Kernel(#[from] KernelError),
}

/// A replay together with the input it was computed from.
#[derive(Debug, Clone)]
pub struct ReplayRun {
    pub stream: LoadedStream,
    pub output: ReplayOutput,
}

/// Rebuild traces and chain from a sorted envelope sequence.
///
/// Pure function of the envelope stream: deterministic by the kernel's
/// guarantee. On error no partial output is returned.
pub fn rebuild(envelopes: &[Envelope]) -> KernelResult<ReplayOutput> {
    let output = AlignmentKernel::replay(envelopes)?;
    info!(
        envelopes = output.global_trace.len(),
        threads = output.thread_traces.len(),
        head = output.chain_head().unwrap_or(GENESIS_HASH),
        "replay complete"
    );
    Ok(output)
}

/// Rebuild and return only the final chain digest.
pub fn rebuild_chain_head(envelopes: &[Envelope]) -> KernelResult<String> {
    let output = rebuild(envelopes)?;
    Ok(output.chain_head().unwrap_or(GENESIS_HASH).to_string())
}

/// Load, sort and replay an envelope file.
pub fn replay_file(path: &Path) -> Result<ReplayRun, ReplayError> {
    let stream = load_envelopes(path)?;
    let output = rebuild(&stream.envelopes)?;
    Ok(ReplayRun { stream, output })
}
