//! In-memory implementation of `ChainStore`.
//!
//! `InMemoryChainStore` is the reference implementation: one `Vec` of
//! committed entries per organization behind a single `Mutex`. The mutex
//! makes `append_if_head_matches` trivially atomic and guarantees readers
//! never observe a partially-written entry.
//!
//! The store also carries two deliberate bypass methods, `tamper_entry` and
//! `remove_entry`, modeling an operator who edits rows directly in storage.
//! They exist so verifier tests and the demo can exercise detection; they
//! are not part of the `ChainStore` trait, so no ledger code path can reach
//! them.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use custodia_contracts::{AuditEntry, ChainHead, LedgerError, LedgerResult, OrgId};

use crate::traits::{AppendOutcome, ChainStore};

/// An in-memory, append-only chain store partitioned per organization.
///
/// # Thread safety
///
/// Every operation acquires the internal `Mutex`, so the compare-and-append
/// check and the write are one critical section. Share the store across
/// threads behind an `Arc`.
pub struct InMemoryChainStore {
    chains: Mutex<HashMap<OrgId, Vec<AuditEntry>>>,
}

impl InMemoryChainStore {
    /// Create an empty store with no chains.
    pub fn new() -> Self {
        Self {
            chains: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> LedgerResult<std::sync::MutexGuard<'_, HashMap<OrgId, Vec<AuditEntry>>>> {
        self.chains.lock().map_err(|e| LedgerError::Store {
            reason: format!("chain store lock poisoned: {e}"),
        })
    }

    /// Number of committed entries for `org`.
    pub fn chain_len(&self, org: &OrgId) -> LedgerResult<u64> {
        let chains = self.lock()?;
        Ok(chains.get(org).map(|c| c.len() as u64).unwrap_or(0))
    }

    // ── Storage-bypass surface (threat-model simulation) ─────────────────────

    /// Edit a committed entry in place, bypassing the append-only API.
    ///
    /// This simulates the adversary the ledger is designed to detect: an
    /// operator with direct storage access. Returns `true` when an entry
    /// with the given sequence existed and was mutated.
    pub fn tamper_entry(
        &self,
        org: &OrgId,
        sequence: u64,
        mutate: impl FnOnce(&mut AuditEntry),
    ) -> LedgerResult<bool> {
        let mut chains = self.lock()?;
        match chains
            .get_mut(org)
            .and_then(|c| c.iter_mut().find(|e| e.sequence == sequence))
        {
            Some(entry) => {
                mutate(entry);
                debug!(org = %org, sequence, "entry tampered via storage bypass");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete a committed entry, bypassing the append-only API.
    ///
    /// Same threat-model role as `tamper_entry`. Returns `true` when an
    /// entry with the given sequence existed and was removed.
    pub fn remove_entry(&self, org: &OrgId, sequence: u64) -> LedgerResult<bool> {
        let mut chains = self.lock()?;
        match chains.get_mut(org) {
            Some(chain) => {
                let before = chain.len();
                chain.retain(|e| e.sequence != sequence);
                Ok(chain.len() < before)
            }
            None => Ok(false),
        }
    }
}

impl Default for InMemoryChainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainStore for InMemoryChainStore {
    fn head_of(&self, org: &OrgId) -> LedgerResult<Option<ChainHead>> {
        let chains = self.lock()?;
        Ok(chains.get(org).and_then(|c| c.last()).map(AuditEntry::head))
    }

    /// Compare-and-append under the store mutex.
    ///
    /// The expected head is matched against the actual last entry; on any
    /// difference — wrong sequence, wrong hash, or an emptiness mismatch —
    /// nothing is written and `HeadConflict` carries what the store held.
    fn append_if_head_matches(
        &self,
        org: &OrgId,
        expected: Option<&ChainHead>,
        entry: AuditEntry,
    ) -> LedgerResult<AppendOutcome> {
        let mut chains = self.lock()?;
        let chain = chains.entry(org.clone()).or_default();
        let actual = chain.last().map(AuditEntry::head);

        if actual.as_ref() != expected {
            debug!(
                org = %org,
                expected_seq = expected.map(|h| h.sequence),
                actual_seq = actual.as_ref().map(|h| h.sequence),
                "append rejected: head moved"
            );
            return Ok(AppendOutcome::HeadConflict { actual });
        }

        chain.push(entry.clone());
        debug!(org = %org, sequence = entry.sequence, "entry committed");
        Ok(AppendOutcome::Committed(entry))
    }

    fn range(&self, org: &OrgId, from_seq: u64, to_seq: u64) -> LedgerResult<Vec<AuditEntry>> {
        let chains = self.lock()?;
        Ok(chains
            .get(org)
            .map(|chain| {
                chain
                    .iter()
                    .filter(|e| e.sequence >= from_seq && e.sequence <= to_seq)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
