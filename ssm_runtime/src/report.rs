//! Replay reports — a replay's traces and chain written out as JSON
//! so a later run can verify envelopes against the recorded chain.
//!
//! Reports carry no timestamps (determinism). The embedded digest is
//! SHA-256 over every other field and guards the file itself.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use ssm_kernel::hashing::GENESIS_HASH;
use ssm_kernel::{ReplayOutput, KERNEL_VERSION};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("report I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bad report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report written by kernel v{found}, this is kernel v{expected}")]
    KernelVersion { expected: u32, found: u32 },

    #[error("report digest mismatch: file content was altered")]
    DigestMismatch,
}

/// On-disk report format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Kernel version at replay time.
    pub kernel_version: u32,
    pub envelope_count: usize,
    pub arrived_in_order: bool,
    /// Final chain digest (GENESIS_HASH for an empty replay).
    pub chain_head: String,
    pub output: ReplayOutput,
    /// SHA-256 over all fields above.
    pub digest: String,
}

/// The digested part of a report, borrowed.
#[derive(Serialize)]
struct DigestedFields<'a> {
    kernel_version: u32,
    envelope_count: usize,
    arrived_in_order: bool,
    chain_head: &'a str,
    output: &'a ReplayOutput,
}

impl ReplayReport {
    pub fn new(output: ReplayOutput, arrived_in_order: bool) -> Result<Self, ExportError> {
        let mut report = Self {
            kernel_version: KERNEL_VERSION,
            envelope_count: output.global_trace.len(),
            arrived_in_order,
            chain_head: output.chain_head().unwrap_or(GENESIS_HASH).to_string(),
            output,
            digest: String::new(),
        };
        report.digest = report_digest(&report)?;
        Ok(report)
    }
}

fn report_digest(report: &ReplayReport) -> Result<String, ExportError> {
    let fields = DigestedFields {
        kernel_version: report.kernel_version,
        envelope_count: report.envelope_count,
        arrived_in_order: report.arrived_in_order,
        chain_head: &report.chain_head,
        output: &report.output,
    };
    let bytes = serde_json::to_vec(&fields)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Write a report to `path`, creating parent directories.
pub fn save_report(path: &Path, report: &ReplayReport) -> Result<PathBuf, ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let content = serde_json::to_string_pretty(report)?;
    let mut file = File::create(path).map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;

    info!(path = %path.display(), head = %report.chain_head, "replay report saved");
    Ok(path.to_path_buf())
}

/// Load a report, checking kernel version and digest.
pub fn load_report(path: &Path) -> Result<ReplayReport, ExportError> {
    let content = fs::read_to_string(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let report: ReplayReport = serde_json::from_str(&content)?;

    if report.kernel_version != KERNEL_VERSION {
        return Err(ExportError::KernelVersion {
            expected: KERNEL_VERSION,
            found: report.kernel_version,
        });
    }
    if !verify_report_digest(&report) {
        return Err(ExportError::DigestMismatch);
    }
    Ok(report)
}

/// True if the embedded digest matches the report and the header
/// agrees with the recorded output.
pub fn verify_report_digest(report: &ReplayReport) -> bool {
    let header_consistent = report.envelope_count == report.output.global_trace.len()
        && report.chain_head == report.output.chain_head().unwrap_or(GENESIS_HASH);
    header_consistent
        && report_digest(report)
            .map(|d| d == report.digest)
            .unwrap_or(false)
}
