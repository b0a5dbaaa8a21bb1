//! Envelope loader — JSON array in, sorted envelope sequence out.
//!
//! Rules:
//!   - The container must be a JSON array of objects
//!   - Every envelope must carry `sequence_number`; one missing is fatal
//!   - Output is stably sorted by `sequence_number` ascending
//!   - Arrival order is reported, never enforced

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use ssm_kernel::events::Envelope;
use ssm_kernel::KernelError;

/// Errors surfaced before any envelope reaches the kernel.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unparseable envelope container: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope container must be a JSON array, got {0}")]
    NotAnArray(&'static str),

    #[error(transparent)]
    Envelope(#[from] KernelError),
}

/// Envelopes ready for the kernel, plus what the loader noticed.
#[derive(Debug, Clone)]
pub struct LoadedStream {
    /// Sorted by `sequence_number` ascending.
    pub envelopes: Vec<Envelope>,
    /// True if the source was already in ascending order.
    pub arrived_in_order: bool,
    /// Sequence numbers seen more than once.
    pub duplicate_sequences: Vec<i64>,
}

/// True iff the slice is non-decreasing in `sequence_number`.
pub fn check_replay_consistency(envelopes: &[Envelope]) -> bool {
    envelopes
        .windows(2)
        .all(|w| w[0].sequence_number <= w[1].sequence_number)
}

/// Parse and sort an envelope container held in memory.
pub fn parse_envelopes(source: &str) -> Result<LoadedStream, LoadError> {
    let root: Value = serde_json::from_str(source)?;
    let items = match root {
        Value::Array(items) => items,
        other => return Err(LoadError::NotAnArray(json_kind(&other))),
    };

    // Parse everything first so a bad record aborts before any output.
    let mut envelopes = items
        .iter()
        .enumerate()
        .map(|(i, v)| Envelope::from_value(i, v))
        .collect::<Result<Vec<_>, _>>()?;

    let arrived_in_order = check_replay_consistency(&envelopes);
    if arrived_in_order {
        info!(count = envelopes.len(), "replay integrity: OK (strictly ordered)");
    } else {
        warn!(
            count = envelopes.len(),
            "envelopes arrived out of order; sorted deterministically"
        );
        envelopes.sort_by_key(|e| e.sequence_number);
    }

    let duplicate_sequences = find_duplicates(&envelopes);
    if !duplicate_sequences.is_empty() {
        warn!(duplicates = ?duplicate_sequences, "duplicate sequence numbers kept in arrival order");
    }

    Ok(LoadedStream {
        envelopes,
        arrived_in_order,
        duplicate_sequences,
    })
}

/// Read, parse and sort an envelope file.
pub fn load_envelopes(path: &Path) -> Result<LoadedStream, LoadError> {
    let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stream = parse_envelopes(&source)?;
    info!(path = %path.display(), count = stream.envelopes.len(), "envelopes loaded");
    Ok(stream)
}

/// Sorted input assumed.
fn find_duplicates(envelopes: &[Envelope]) -> Vec<i64> {
    let dups: BTreeSet<i64> = envelopes
        .windows(2)
        .filter(|w| w[0].sequence_number == w[1].sequence_number)
        .map(|w| w[0].sequence_number)
        .collect();
    dups.into_iter().collect()
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
