#![forbid(unsafe_code)]

/// Kernel v1 — Immutable. Behavioral changes require kernel_v2.
pub const KERNEL_VERSION: u32 = 1;

pub mod error;
pub mod transform;
pub mod events;
pub mod state;
pub mod domain;
pub mod registry;
pub mod quero;
pub mod zeta;
pub mod transitions;
pub mod invariants;
pub mod hashing;
pub mod engine;

pub use domain::{HashLink, ReplayOutput, Scope, ThreadTrace, TraceRecord};
pub use engine::AlignmentKernel;
pub use error::{KernelError, KernelResult};
pub use events::Envelope;
