//! # custodia-ledger
//!
//! The append side of the CUSTODIA tamper-evident audit ledger.
//!
//! Every compliance-relevant action any module performs becomes an
//! `AuditEntry` in a per-organization, SHA-256 hash-linked chain. Tampering
//! with any committed entry — even a single byte — breaks the chain and is
//! detected by `custodia-verify`.
//!
//! This crate provides:
//! - `chain::hash_entry` — the pinned, versioned entry hash scheme
//! - `OrgGate` — bounded-timeout per-organization mutual exclusion
//! - `HashChainAppender` — the append protocol with optimistic
//!   compare-and-append retry
//! - `LedgerConfig` — TOML-loadable tunables
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use custodia_ledger::{HashChainAppender, LedgerConfig};
//! use custodia_store::InMemoryChainStore;
//!
//! let store = Arc::new(InMemoryChainStore::new());
//! let appender = HashChainAppender::new(Arc::clone(&store), LedgerConfig::default());
//! let committed = appender.append(&org, draft)?;
//! ```

pub mod appender;
pub mod chain;
pub mod config;
pub mod gate;

pub use appender::HashChainAppender;
pub use chain::{hash_entry, HASH_SCHEME};
pub use config::LedgerConfig;
pub use gate::OrgGate;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use serde_json::json;

    use custodia_contracts::{
        AuditEntry, ChainHead, EntryDraft, LedgerError, LedgerResult, OrgId,
    };
    use custodia_store::{AppendOutcome, ChainStore, InMemoryChainStore};

    use super::{chain::hash_entry, HashChainAppender, LedgerConfig};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn make_draft(action: &str) -> EntryDraft {
        EntryDraft {
            agent: "risk-assessment".to_string(),
            action: action.to_string(),
            event_type: "assessment_completed".to_string(),
            event_category: "ai-risk".to_string(),
            actor_id: Some("user-3".to_string()),
            status: "completed".to_string(),
            input_hash: "1a".repeat(32),
            output_hash: Some("2b".repeat(32)),
            request_payload: json!({ "action": action }),
            response_summary: json!({ "ok": true }),
            reasoning_chain: json!([{ "step": "score" }]),
        }
    }

    fn make_appender(store: &Arc<InMemoryChainStore>) -> HashChainAppender<InMemoryChainStore> {
        HashChainAppender::new(Arc::clone(store), LedgerConfig::default())
    }

    // ── Happy path ────────────────────────────────────────────────────────────

    /// Sequential appends produce a gapless chain with correct linkage.
    #[test]
    fn sequential_appends_link_correctly() {
        let store = Arc::new(InMemoryChainStore::new());
        let appender = make_appender(&store);
        let org = OrgId::new("org-acme");

        let e1 = appender.append(&org, make_draft("a")).unwrap();
        let e2 = appender.append(&org, make_draft("b")).unwrap();
        let e3 = appender.append(&org, make_draft("c")).unwrap();

        assert_eq!((e1.sequence, e2.sequence, e3.sequence), (1, 2, 3));
        assert_eq!(e1.prev_hash, AuditEntry::GENESIS_HASH);
        assert_eq!(e2.prev_hash, e1.entry_hash);
        assert_eq!(e3.prev_hash, e2.entry_hash);

        // Each stored entry_hash must be recomputable from its own fields.
        for entry in [&e1, &e2, &e3] {
            assert_eq!(entry.entry_hash, hash_entry(entry));
        }
    }

    /// A rejected draft persists nothing.
    #[test]
    fn validation_failure_persists_nothing() {
        let store = Arc::new(InMemoryChainStore::new());
        let appender = make_appender(&store);
        let org = OrgId::new("org-acme");

        let mut bad = make_draft("a");
        bad.agent = String::new();

        let err = appender.append(&org, bad).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
        assert_eq!(store.chain_len(&org).unwrap(), 0);
    }

    // ── Concurrency ───────────────────────────────────────────────────────────

    /// Many threads appending to one org: every append commits exactly one
    /// sequence, the chain is gapless, and no two entries share a prev_hash.
    #[test]
    fn concurrent_same_org_appends_never_fork() {
        let store = Arc::new(InMemoryChainStore::new());
        let appender = Arc::new(make_appender(&store));
        let org = OrgId::new("org-acme");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let appender = Arc::clone(&appender);
                let org = org.clone();
                std::thread::spawn(move || {
                    for j in 0..5 {
                        appender
                            .append(&org, make_draft(&format!("t{i}-{j}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let entries = store.range(&org, 1, u64::MAX).unwrap();
        assert_eq!(entries.len(), 40);

        let sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, (1..=40).collect::<Vec<u64>>());

        let prev_hashes: HashSet<&str> =
            entries.iter().map(|e| e.prev_hash.as_str()).collect();
        assert_eq!(prev_hashes.len(), 40, "a shared prev_hash would mean a fork");
    }

    /// Appends to different organizations proceed fully in parallel.
    #[test]
    fn different_org_appends_run_in_parallel() {
        let store = Arc::new(InMemoryChainStore::new());
        // A short lock timeout: if org chains contended on one lock, the
        // slow holder would starve the other org past the timeout.
        let appender = Arc::new(HashChainAppender::new(
            Arc::clone(&store),
            LedgerConfig {
                lock_timeout_ms: 200,
                ..LedgerConfig::default()
            },
        ));

        let handles: Vec<_> = ["org-a", "org-b", "org-c", "org-d"]
            .into_iter()
            .map(|org_name| {
                let appender = Arc::clone(&appender);
                std::thread::spawn(move || {
                    let org = OrgId::new(org_name);
                    for j in 0..20 {
                        appender.append(&org, make_draft(&format!("{j}"))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for org_name in ["org-a", "org-b", "org-c", "org-d"] {
            assert_eq!(store.chain_len(&OrgId::new(org_name)).unwrap(), 20);
        }
    }

    // ── Head-conflict retry ───────────────────────────────────────────────────

    /// A store wrapper that reports a head conflict a fixed number of times
    /// before delegating, simulating a second service instance winning the
    /// race.
    struct ConflictingStore {
        inner: InMemoryChainStore,
        conflicts_left: std::sync::Mutex<u32>,
    }

    impl ChainStore for ConflictingStore {
        fn head_of(&self, org: &OrgId) -> LedgerResult<Option<ChainHead>> {
            self.inner.head_of(org)
        }

        fn append_if_head_matches(
            &self,
            org: &OrgId,
            expected: Option<&ChainHead>,
            entry: AuditEntry,
        ) -> LedgerResult<AppendOutcome> {
            let mut left = self.conflicts_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Ok(AppendOutcome::HeadConflict {
                    actual: self.inner.head_of(org)?,
                });
            }
            drop(left);
            self.inner.append_if_head_matches(org, expected, entry)
        }

        fn range(&self, org: &OrgId, from: u64, to: u64) -> LedgerResult<Vec<AuditEntry>> {
            self.inner.range(org, from, to)
        }
    }

    /// The appender rereads the head and retries through transient conflicts.
    #[test]
    fn head_conflicts_are_retried() {
        let store = Arc::new(ConflictingStore {
            inner: InMemoryChainStore::new(),
            conflicts_left: std::sync::Mutex::new(2),
        });
        let appender = HashChainAppender::new(Arc::clone(&store), LedgerConfig::default());
        let org = OrgId::new("org-acme");

        let committed = appender.append(&org, make_draft("a")).unwrap();
        assert_eq!(committed.sequence, 1);
    }

    /// Exhausting the retry budget surfaces Retryable, and nothing persists.
    #[test]
    fn unresolvable_conflict_is_retryable() {
        let store = Arc::new(ConflictingStore {
            inner: InMemoryChainStore::new(),
            conflicts_left: std::sync::Mutex::new(u32::MAX),
        });
        let appender = HashChainAppender::new(
            Arc::clone(&store),
            LedgerConfig {
                max_append_attempts: 3,
                ..LedgerConfig::default()
            },
        );
        let org = OrgId::new("org-acme");

        let err = appender.append(&org, make_draft("a")).unwrap_err();
        assert!(matches!(err, LedgerError::Retryable { .. }));
        assert!(store.range(&org, 1, u64::MAX).unwrap().is_empty());
    }
}
