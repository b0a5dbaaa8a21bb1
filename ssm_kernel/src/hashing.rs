/// SSM Kernel v1 — Hash Chain
///
/// One link per processed envelope, in processing order.
///
/// Payload rules:
///   - `{sequence_number}|{a_raw}|{weight}|{thread_id}|{prev_hash}`
///   - numbers written as integer literals in the source render as
///     integers (0, 1, -3)
///   - other numbers render as shortest round-trip floats, positional
///     for exponents in [-4, 16) (1.0, 0.32, -0.5), otherwise with a
///     signed two-digit exponent (1e-05, 2.5e+16)
///   - prev_hash of the first link is twelve '0' characters
///   - passthrough metadata is never part of the payload
///
/// Digest: SHA-256 of the UTF-8 payload, lowercase hex, first 12 chars.

use sha2::{Digest, Sha256};

use crate::domain::HashLink;
use crate::events::{as_exact_i64, Envelope, NumberForm};

/// Number of hex characters kept from each digest.
pub const HASH_PREFIX_LEN: usize = 12;

/// "Previous" digest of the first link.
pub const GENESIS_HASH: &str = "000000000000";

/// Render a float for the canonical payload.
pub fn canonical_float(x: f64) -> String {
    if x == 0.0 {
        let zero = if x.is_sign_negative() { "-0.0" } else { "0.0" };
        return zero.to_string();
    }
    if !x.is_finite() {
        return format!("{}", x);
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "-2.5e-7".
    let sci = format!("{:e}", x);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => ("-", m),
        None => ("", mantissa),
    };

    if !(-4..16).contains(&exp) {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs());
    }

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let body = if exp < 0 {
        format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
    } else {
        let point = (exp + 1) as usize;
        if digits.len() <= point {
            format!("{}{}.0", digits, "0".repeat(point - digits.len()))
        } else {
            format!("{}.{}", &digits[..point], &digits[point..])
        }
    };
    format!("{sign}{body}")
}

/// Render a hashed number in the form it was written in.
pub fn canonical_number(x: f64, form: NumberForm) -> String {
    match (form, as_exact_i64(x)) {
        (NumberForm::Integer, Some(n)) => n.to_string(),
        _ => canonical_float(x),
    }
}

/// Canonical payload for one link.
pub fn canonical_payload(env: &Envelope, prev_hash: &str) -> String {
    let sequence = match env.forms.sequence_number {
        NumberForm::Integer => env.sequence_number.to_string(),
        NumberForm::Float => canonical_float(env.sequence_number as f64),
    };
    format!(
        "{}|{}|{}|{}|{}",
        sequence,
        canonical_number(env.a_raw, env.forms.a_raw),
        canonical_number(env.weight, env.forms.weight),
        env.thread_id,
        prev_hash
    )
}

/// Truncated SHA-256 of a payload. Lowercase hex.
pub fn truncated_digest(payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    let mut hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex.truncate(HASH_PREFIX_LEN);
    hex
}

/// Digest of the link for `env` chained after `prev_hash`.
pub fn link_hash(env: &Envelope, prev_hash: &str) -> String {
    truncated_digest(&canonical_payload(env, prev_hash))
}

/// Append-only chain. Links can only be added at the head.
#[derive(Debug, Clone)]
pub struct HashChain {
    links: Vec<HashLink>,
    head: String,
}

impl Default for HashChain {
    fn default() -> Self {
        Self::new()
    }
}

impl HashChain {
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            head: GENESIS_HASH.to_string(),
        }
    }

    /// Hash `env` against the current head and append the new link.
    pub fn append(&mut self, env: &Envelope) -> HashLink {
        let hash_value = link_hash(env, &self.head);
        let link = HashLink {
            sequence_number: env.sequence_number,
            hash_value,
        };
        self.head = link.hash_value.clone();
        self.links.push(link.clone());
        link
    }

    /// Digest of the most recent link (GENESIS_HASH when empty).
    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn links(&self) -> &[HashLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<HashLink> {
        self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// A recorded link that does not match its recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMismatch {
    /// Zero-based position in processing order.
    pub position: usize,
    /// Sequence number of the candidate envelope at this position.
    pub sequence_number: i64,
    pub recorded_sequence: i64,
    pub expected: String,
    pub recorded: String,
}

/// Outcome of verifying a recorded chain against candidate envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    pub checked: usize,
    pub candidate_len: usize,
    pub recorded_len: usize,
    /// Every divergent position, ascending.
    pub mismatches: Vec<LinkMismatch>,
}

impl ChainVerification {
    pub fn is_valid(&self) -> bool {
        self.mismatches.is_empty() && self.candidate_len == self.recorded_len
    }

    /// The tamper point: the earliest divergent link.
    pub fn first_divergence(&self) -> Option<&LinkMismatch> {
        self.mismatches.first()
    }
}

/// Recompute each link from the candidate envelope and the *recorded*
/// previous digest, and compare with the recorded link.
///
/// Does not stop at the first mismatch. Using the recorded predecessor
/// isolates each tampered position instead of flagging the whole tail.
pub fn verify_chain(envelopes: &[Envelope], recorded: &[HashLink]) -> ChainVerification {
    let checked = envelopes.len().min(recorded.len());
    let mut mismatches = Vec::new();

    for i in 0..checked {
        let prev = if i == 0 {
            GENESIS_HASH
        } else {
            recorded[i - 1].hash_value.as_str()
        };
        let env = &envelopes[i];
        let link = &recorded[i];
        let expected = link_hash(env, prev);
        if expected != link.hash_value || env.sequence_number != link.sequence_number {
            mismatches.push(LinkMismatch {
                position: i,
                sequence_number: env.sequence_number,
                recorded_sequence: link.sequence_number,
                expected,
                recorded: link.hash_value.clone(),
            });
        }
    }

    ChainVerification {
        checked,
        candidate_len: envelopes.len(),
        recorded_len: recorded.len(),
        mismatches,
    }
}
