//! Ledger entry and chain-head types.
//!
//! `AuditEntry` is a single committed entry in one organization's hash chain.
//! `EntryDraft` is the candidate an external compliance module submits — the
//! appender assigns everything the caller is not allowed to choose (id,
//! sequence, timestamp, prev_hash, entry_hash).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for the tenant that owns a chain.
///
/// Chains are partitioned per organization and never interleave. Used as a
/// map key everywhere, so it derives `Hash`/`Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(pub String);

impl OrgId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single committed entry in an organization's audit chain.
///
/// Each entry commits to its predecessor via `prev_hash`, forming an
/// append-only chain. Modifying any field — including the opaque payload
/// blobs — invalidates `entry_hash` and every subsequent `prev_hash`, which
/// the verifier detects.
///
/// The ledger never interprets `request_payload`, `response_summary`, or
/// `reasoning_chain`; they are folded into the hash input so their contents
/// are tamper-evident all the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique id, assigned at append time.
    pub id: Uuid,

    /// The tenant whose chain this entry belongs to.
    pub organization_id: OrgId,

    /// Position in the chain. Gapless, monotonically increasing, starts at 1.
    pub sequence: u64,

    /// Wall-clock commit time (UTC), stamped by the appender.
    pub timestamp: DateTime<Utc>,

    /// Which module produced the recorded action (e.g. "risk-assessment").
    pub agent: String,

    /// What the module did (e.g. "score_vendor_model").
    pub action: String,

    /// Event discriminant within the caller's vocabulary.
    pub event_type: String,

    /// Coarse grouping for audit-UI filtering (e.g. "privacy", "esg").
    pub event_category: String,

    /// The human or service principal on whose behalf the action ran.
    pub actor_id: Option<String>,

    /// Caller-reported outcome (e.g. "completed", "rejected").
    pub status: String,

    /// Caller-computed digest of the triggering request.
    ///
    /// The ledger validates the shape (hex or base64), trusts the value, and
    /// folds it into `entry_hash` so later tampering is still detectable.
    pub input_hash: String,

    /// Caller-computed digest of the resulting response, when one exists.
    pub output_hash: Option<String>,

    /// Opaque JSON body of the triggering request. Never interpreted.
    pub request_payload: serde_json::Value,

    /// Opaque JSON summary of the response. Never interpreted.
    pub response_summary: serde_json::Value,

    /// Opaque JSON trace of intermediate reasoning steps. Never interpreted.
    pub reasoning_chain: serde_json::Value,

    /// `entry_hash` of the previous entry, or `GENESIS_HASH` at sequence 1.
    pub prev_hash: String,

    /// SHA-256 hash (lowercase hex) over this entry's canonical content.
    ///
    /// Computed by `custodia_ledger::chain::hash_entry` over every other
    /// field concatenated with `prev_hash`. Never part of its own input.
    pub entry_hash: String,
}

impl AuditEntry {
    /// The sentinel `prev_hash` used for the first entry in every chain.
    ///
    /// 64 hex zeros — a value that can never be the SHA-256 of real data,
    /// making genesis detection unambiguous.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";

    /// The chain-head coordinates of this entry.
    pub fn head(&self) -> ChainHead {
        ChainHead {
            sequence: self.sequence,
            entry_hash: self.entry_hash.clone(),
        }
    }
}

/// A candidate entry submitted by an external compliance module.
///
/// Carries every caller-supplied field of `AuditEntry` and nothing the
/// appender assigns. The classification strings are an open extension
/// point — new modules introduce new `agent`/`action`/`event_type` values
/// without any ledger change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDraft {
    pub agent: String,
    pub action: String,
    pub event_type: String,
    pub event_category: String,
    pub actor_id: Option<String>,
    pub status: String,
    pub input_hash: String,
    pub output_hash: Option<String>,
    pub request_payload: serde_json::Value,
    pub response_summary: serde_json::Value,
    pub reasoning_chain: serde_json::Value,
}

/// The most recently committed entry's coordinates for one organization.
///
/// Read at the start of every append and passed back to the store's
/// compare-and-append so a head that moved in between is detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    /// Sequence of the last committed entry.
    pub sequence: u64,

    /// `entry_hash` of the last committed entry.
    pub entry_hash: String,
}
