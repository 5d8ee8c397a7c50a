//! The chain verifier.
//!
//! `ChainVerifier` walks one organization's stored chain, recomputes every
//! entry's hash under the pinned scheme, cross-checks linkage, and emits a
//! `VerificationReport`. Verification is read-only and advisory: findings
//! never halt any other subsystem, and the verifier never "fixes" history —
//! its job is to preserve evidence of tampering, not mask it.
//!
//! Walk rules, per entry in sequence order:
//!
//! 1. A jump in sequence numbers is a `MissingSequenceGap`, reported at the
//!    position of the first entry after the gap. Trust in the expected
//!    prev-hash is resynced to the recomputed hash of that entry so later,
//!    unrelated breaks still surface on their own merits.
//! 2. A stored `entry_hash` that differs from the recomputed value is a
//!    `SelfHashMismatch` at this position. Forward trust continues from the
//!    **recomputed** value, never the possibly-tampered stored one.
//! 3. A stored `prev_hash` that differs from the expected value is a
//!    `LinkMismatch` (`GenesisMismatch` when the expectation is the genesis
//!    sentinel at sequence 1).
//!
//! A non-empty chain with no entry at sequence 1 is store corruption; a
//! full walk reports it as a break at position 0, never an error.
//!
//! Every finding in the walked range is accumulated — operators get the
//! full failure set in one pass, not just the first break.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use custodia_contracts::{
    AuditEntry, BreakDetail, BreakType, LedgerResult, OrgId, VerificationReport,
};
use custodia_ledger::{hash_entry, LedgerConfig};
use custodia_store::ChainStore;

/// Cooperative cancellation handle for long verification runs.
///
/// Cheap to clone; a UI can hold one end and flip it while the walk holds
/// the other.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The walk stops at the next entry boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Walks stored chains and reports every break it finds.
pub struct ChainVerifier<S: ChainStore> {
    store: Arc<S>,
    progress_chunk: u64,
}

impl<S: ChainStore> ChainVerifier<S> {
    /// Create a verifier with the default progress-chunk size.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &LedgerConfig::default())
    }

    /// Create a verifier using `verify_progress_chunk` from `config`.
    pub fn with_config(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self {
            store,
            progress_chunk: config.verify_progress_chunk.max(1),
        }
    }

    /// Full verification from sequence 1 to the current head.
    ///
    /// Always anchored at the genesis sentinel — this is the ground truth a
    /// ranged verification must ultimately be compared against.
    pub fn verify(&self, org: &OrgId) -> LedgerResult<VerificationReport> {
        self.walk(org, 1, None, None, None, &mut |_| {})
    }

    /// Ranged verification over `[from_seq, to_seq]` (head when `to_seq` is
    /// `None`).
    ///
    /// When `from_seq > 1` the caller may supply `anchor`, the
    /// previously-verified `entry_hash` at `from_seq - 1`; the report is
    /// then marked anchored. Without an anchor the first entry's linkage
    /// cannot be judged and the report is advisory only.
    pub fn verify_range(
        &self,
        org: &OrgId,
        from_seq: u64,
        to_seq: Option<u64>,
        anchor: Option<&str>,
    ) -> LedgerResult<VerificationReport> {
        self.walk(org, from_seq.max(1), to_seq, anchor, None, &mut |_| {})
    }

    /// Full verification that can be aborted and reports progress.
    ///
    /// `on_progress` receives the count of entries walked so far, once per
    /// progress chunk and once at the end. When `token` is cancelled the
    /// walk stops at the next entry and the report comes back with
    /// `cancelled: true`, covering only what was examined.
    pub fn verify_cancellable(
        &self,
        org: &OrgId,
        token: &CancelToken,
        on_progress: &mut dyn FnMut(u64),
    ) -> LedgerResult<VerificationReport> {
        self.walk(org, 1, None, None, Some(token), on_progress)
    }

    // ── The walk ──────────────────────────────────────────────────────────────

    fn walk(
        &self,
        org: &OrgId,
        from_seq: u64,
        to_seq: Option<u64>,
        anchor: Option<&str>,
        token: Option<&CancelToken>,
        on_progress: &mut dyn FnMut(u64),
    ) -> LedgerResult<VerificationReport> {
        let head = self.store.head_of(org)?;

        let to_seq = match (to_seq, &head) {
            (Some(to), _) => to,
            (None, Some(h)) => h.sequence,
            (None, None) => 0,
        };

        if head.is_none() || to_seq < from_seq {
            debug!(org = %org, "verification over empty chain/range");
            let mut report = VerificationReport::empty(org.clone());
            report.anchored = from_seq == 1 || anchor.is_some();
            return Ok(report);
        }

        let entries = self.store.range(org, from_seq, to_seq)?;
        let full_walk = from_seq == 1;
        let anchored = full_walk || anchor.is_some();

        let mut details: Vec<BreakDetail> = Vec::new();
        let mut expected_prev: Option<String> = if full_walk {
            Some(AuditEntry::GENESIS_HASH.to_string())
        } else {
            anchor.map(str::to_string)
        };
        let mut expected_seq = from_seq;
        let mut walked: u64 = 0;
        let mut last_seq: Option<u64> = None;
        let mut cancelled = false;

        // A non-empty chain whose first stored sequence is not 1 is store
        // corruption; a full walk reports it at position 0.
        if full_walk {
            let first_seq = entries.first().map(|e| e.sequence);
            if first_seq != Some(1) {
                warn!(org = %org, ?first_seq, "non-empty chain has no entry at sequence 1");
                details.push(BreakDetail {
                    position: 0,
                    break_type: BreakType::MissingSequenceGap,
                    expected: "sequence 1".to_string(),
                    found: match first_seq {
                        Some(seq) => format!("first stored sequence is {seq}"),
                        None => "no stored entries in range".to_string(),
                    },
                });
                expected_prev = None;
                if let Some(seq) = first_seq {
                    expected_seq = seq;
                }
            }
        }

        for entry in &entries {
            if token.map(CancelToken::is_cancelled).unwrap_or(false) {
                info!(org = %org, walked, "verification cancelled");
                cancelled = true;
                break;
            }

            // Rule 1: sequence continuity.
            if entry.sequence > expected_seq {
                details.push(BreakDetail {
                    position: entry.sequence,
                    break_type: BreakType::MissingSequenceGap,
                    expected: format!("sequence {expected_seq}"),
                    found: format!("sequence {}", entry.sequence),
                });
                // The link from the missing predecessor is unknowable; the
                // gap finding subsumes this entry's link check.
                expected_prev = None;
            }

            // Rule 2: the stored entry_hash must match the recomputed value.
            let recomputed = hash_entry(entry);
            if recomputed != entry.entry_hash {
                details.push(BreakDetail {
                    position: entry.sequence,
                    break_type: BreakType::SelfHashMismatch,
                    expected: recomputed.clone(),
                    found: entry.entry_hash.clone(),
                });
            }

            // Rule 3: the stored prev_hash must match the expected link.
            if let Some(prev) = &expected_prev {
                if entry.prev_hash != *prev {
                    let break_type = if entry.sequence == 1 {
                        BreakType::GenesisMismatch
                    } else {
                        BreakType::LinkMismatch
                    };
                    details.push(BreakDetail {
                        position: entry.sequence,
                        break_type,
                        expected: prev.clone(),
                        found: entry.prev_hash.clone(),
                    });
                }
            }

            // Chain forward trust from the recomputed value.
            expected_prev = Some(recomputed);
            expected_seq = entry.sequence + 1;
            last_seq = Some(entry.sequence);
            walked += 1;

            if walked % self.progress_chunk == 0 {
                on_progress(walked);
            }
        }
        on_progress(walked);

        let valid = details.is_empty();
        let report = VerificationReport {
            organization_id: org.clone(),
            valid,
            total_entries: walked,
            first_broken_position: details.first().map(|d| d.position),
            break_type: details.first().map(|d| d.break_type),
            details,
            range: last_seq.map(|last| (from_seq, last)),
            anchored,
            cancelled,
            verified_at: Utc::now(),
        };

        if report.valid {
            info!(org = %org, total = report.total_entries, "chain verified intact");
        } else {
            warn!(
                org = %org,
                total = report.total_entries,
                first_broken_position = ?report.first_broken_position,
                break_type = ?report.break_type,
                findings = report.details.len(),
                "chain verification found breaks"
            );
        }
        Ok(report)
    }
}
