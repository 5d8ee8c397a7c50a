//! Error taxonomy for the CUSTODIA ledger.
//!
//! All fallible ledger operations return `LedgerResult<T>`. The taxonomy is
//! deliberately small: a candidate is either malformed (`Validation`), the
//! attempt hit transient contention (`Retryable`), the store itself failed
//! (`Store`), or configuration was bad (`Config`).
//!
//! Integrity findings are **not** errors. The verifier reports tampering as
//! data in a `VerificationReport` — the ledger's job on detecting tampering
//! is to preserve and surface the evidence, never to throw it away.

use thiserror::Error;

/// The unified error type for the CUSTODIA ledger crates.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The candidate entry is malformed. Nothing was persisted; the caller
    /// must fix the draft and resubmit.
    #[error("invalid audit entry: {reason}")]
    Validation { reason: String },

    /// Lock timeout or store contention. Nothing was persisted; the caller
    /// should retry with backoff — an audit event must never be silently
    /// dropped on transient failure.
    #[error("retryable ledger failure: {reason}")]
    Retryable { reason: String },

    /// The chain store failed internally (e.g. a poisoned lock).
    #[error("chain store failure: {reason}")]
    Store { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the CUSTODIA crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
