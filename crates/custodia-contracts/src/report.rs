//! Verification report types.
//!
//! A `VerificationReport` is the verifier's only output: a structured
//! account of one walk over a stored chain. Breaks are findings, never
//! errors — downstream consumers (audit UI, compliance exports) pattern
//! match on `BreakType` to render and route them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::OrgId;

/// The kind of integrity break found at one chain position.
///
/// Closed set, consumed via pattern matching. New compliance modules add
/// new action strings, never new break kinds — the chain math does not
/// change with the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakType {
    /// The entry's stored `entry_hash` does not match the hash recomputed
    /// from its stored fields — the entry itself was edited.
    SelfHashMismatch,

    /// The entry's stored `prev_hash` does not match the recomputed hash of
    /// its predecessor — the chain was reordered or its predecessor edited.
    LinkMismatch,

    /// A sequence number expected in the walked range is absent — an entry
    /// was deleted from storage.
    MissingSequenceGap,

    /// The first entry of a full walk does not link to the genesis sentinel.
    GenesisMismatch,
}

impl std::fmt::Display for BreakType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BreakType::SelfHashMismatch => "SELF_HASH_MISMATCH",
            BreakType::LinkMismatch => "LINK_MISMATCH",
            BreakType::MissingSequenceGap => "MISSING_SEQUENCE_GAP",
            BreakType::GenesisMismatch => "GENESIS_MISMATCH",
        };
        f.write_str(s)
    }
}

/// One finding at one chain position.
///
/// `position` is the sequence number at which the break was observed; a
/// non-empty chain with no entry at sequence 1 is reported at position 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakDetail {
    pub position: u64,
    pub break_type: BreakType,

    /// What the walk expected at this position (a hash or a sequence number,
    /// rendered as a string).
    pub expected: String,

    /// What storage actually held.
    pub found: String,
}

/// The structured outcome of one verification walk.
///
/// Every finding encountered is accumulated in `details` — operators see
/// the full picture in one pass, not just the first break. `valid` is true
/// exactly when `details` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// The organization whose chain was walked.
    pub organization_id: OrgId,

    /// True when every entry in the walked range checked out.
    pub valid: bool,

    /// Number of entries actually examined.
    pub total_entries: u64,

    /// Position of the earliest break, or `None` for a clean walk.
    pub first_broken_position: Option<u64>,

    /// Kind of the earliest break, or `None` for a clean walk.
    pub break_type: Option<BreakType>,

    /// Every finding, in walk order.
    pub details: Vec<BreakDetail>,

    /// The inclusive sequence range that was walked, `None` for an empty
    /// chain.
    pub range: Option<(u64, u64)>,

    /// True only for a full walk from sequence 1 or a ranged walk anchored
    /// to a previously-verified hash. An unanchored ranged report is not
    /// authoritative on its own.
    pub anchored: bool,

    /// True when the walk was cancelled before reaching the end of the
    /// requested range; the report covers what was walked so far.
    pub cancelled: bool,

    /// When the walk finished (UTC).
    pub verified_at: DateTime<Utc>,
}

impl VerificationReport {
    /// A clean report over an empty chain — trivially valid.
    pub fn empty(organization_id: OrgId) -> Self {
        Self {
            organization_id,
            valid: true,
            total_entries: 0,
            first_broken_position: None,
            break_type: None,
            details: Vec::new(),
            range: None,
            anchored: true,
            cancelled: false,
            verified_at: Utc::now(),
        }
    }
}
