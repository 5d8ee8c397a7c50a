//! The chain storage contract.
//!
//! `ChainStore` is the trust boundary between the ledger and whatever holds
//! its rows. The appender and the verifier speak only this trait; an
//! implementation may be the in-memory reference store, a SQL table with a
//! unique `(organization_id, sequence)` constraint, or anything else that
//! honors the contract below.
//!
//! The one hard requirement is that `append_if_head_matches` is atomic with
//! respect to concurrent writers. The per-organization gate already
//! serializes application-level callers, but the store's own
//! compare-and-append is the last line of defense against races between
//! multiple service instances sharing one backing store.

use custodia_contracts::{AuditEntry, ChainHead, LedgerResult, OrgId};

/// Outcome of a compare-and-append attempt.
///
/// `HeadConflict` is not an error — it is the optimistic-concurrency signal
/// the appender retries on. It carries the head the store actually held so
/// the retry can log what moved underneath it.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// The expected head matched and the entry is durably committed.
    Committed(AuditEntry),

    /// Another writer advanced the head between the caller's read and this
    /// append. Nothing was written.
    HeadConflict { actual: Option<ChainHead> },
}

/// Durable, ordered, append-only persistence of audit entries, partitioned
/// per organization.
///
/// Implementations must never expose a partially-written entry to readers:
/// a concurrent `range` call either sees a committed entry or does not see
/// it at all. Nothing in this trait can modify or delete a committed row —
/// append is the only mutation.
pub trait ChainStore: Send + Sync {
    /// The coordinates of the most recently committed entry for `org`, or
    /// `None` for an empty chain.
    fn head_of(&self, org: &OrgId) -> LedgerResult<Option<ChainHead>>;

    /// Atomically append `entry` if and only if the chain head still equals
    /// `expected` (`None` meaning "the chain is empty").
    ///
    /// The comparison and the write happen under one critical section (or
    /// one transaction, for a database-backed store). On mismatch the store
    /// returns `AppendOutcome::HeadConflict` and writes nothing.
    fn append_if_head_matches(
        &self,
        org: &OrgId,
        expected: Option<&ChainHead>,
        entry: AuditEntry,
    ) -> LedgerResult<AppendOutcome>;

    /// All committed entries for `org` with `from_seq <= sequence <= to_seq`,
    /// in ascending sequence order. Sequences absent from storage are simply
    /// absent from the result — gap detection is the verifier's job.
    fn range(&self, org: &OrgId, from_seq: u64, to_seq: u64) -> LedgerResult<Vec<AuditEntry>>;
}
