#![forbid(unsafe_code)]

//! SSM Kernel v1 — Rust Runtime
//!
//! Wraps the v1 alignment kernel with loading, replay, audit,
//! reporting and text rendering.
//!
//! No numeric logic lives here — all transitions, drift and hashing
//! are delegated to the kernel.

pub mod config;
pub mod logging;
pub mod loader;
pub mod replay;
pub mod audit;
pub mod report;
pub mod scoreboard;
