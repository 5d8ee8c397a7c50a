//! # custodia-verify
//!
//! Read-only verification for CUSTODIA audit chains.
//!
//! This crate provides:
//! - `ChainVerifier` — full, ranged, and cancellable verification walks
//! - `CancelToken` — cooperative cancellation for UI-initiated runs
//!
//! Findings are data, never errors: a broken chain produces a
//! `VerificationReport` with `valid = false` and one `BreakDetail` per
//! finding, consumed downstream by `custodia-report` and the audit UI.

pub mod verifier;

pub use verifier::{CancelToken, ChainVerifier};

// ── Tests ─────────────────────────────────────────────────────────────────────
