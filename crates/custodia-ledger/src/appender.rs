//! The append protocol.
//!
//! `HashChainAppender` is the only way an entry enters a chain. One append:
//!
//!   validate draft → [org lock] read head → assign sequence/prev_hash →
//!   seal with `hash_entry` → compare-and-append → retry on head conflict
//!
//! The org gate serializes in-process callers; the store's
//! compare-and-append catches writers in other processes. Either way the
//! postconditions hold: at most one entry per `(org, sequence)`, no two
//! entries sharing a `prev_hash`, and an all-or-nothing commit.
//!
//! Idempotency is a caller concern. A module retrying a logically identical
//! action should carry its own idempotency key inside `request_payload`;
//! the ledger never deduplicates by payload content, because that would
//! require interpreting payloads.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use custodia_contracts::{
    AuditEntry, EntryDraft, LedgerError, LedgerResult, OrgId,
};
use custodia_store::{AppendOutcome, ChainStore};

use crate::{chain::hash_entry, config::LedgerConfig, gate::OrgGate};

/// Appends candidate entries to per-organization hash chains.
///
/// Cheap to share behind an `Arc`; all interior state is the store handle
/// and the gate.
pub struct HashChainAppender<S: ChainStore> {
    store: Arc<S>,
    gate: OrgGate,
    config: LedgerConfig,
}

impl<S: ChainStore> HashChainAppender<S> {
    /// Create an appender over `store` with the given tunables.
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Self {
        let gate = OrgGate::new(config.lock_timeout());
        Self { store, gate, config }
    }

    /// Append one candidate entry to `org`'s chain.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Validation` — the draft is malformed; nothing was
    ///   persisted and the caller must fix and resubmit.
    /// - `LedgerError::Retryable` — the org lock timed out or the head kept
    ///   moving for `max_append_attempts` tries; nothing was persisted and
    ///   the caller should retry with backoff. Audit events must never be
    ///   silently dropped on transient failure.
    pub fn append(&self, org: &OrgId, draft: EntryDraft) -> LedgerResult<AuditEntry> {
        validate_draft(&draft)?;
        self.gate.with_org_lock(org, || self.append_locked(org, &draft))
    }

    /// The critical section: runs with `org`'s lock held.
    fn append_locked(&self, org: &OrgId, draft: &EntryDraft) -> LedgerResult<AuditEntry> {
        for attempt in 1..=self.config.max_append_attempts {
            let head = self.store.head_of(org)?;
            let (sequence, prev_hash) = match &head {
                Some(h) => (h.sequence + 1, h.entry_hash.clone()),
                None => (1, AuditEntry::GENESIS_HASH.to_string()),
            };

            let mut entry = AuditEntry {
                id: Uuid::new_v4(),
                organization_id: org.clone(),
                sequence,
                timestamp: Utc::now(),
                agent: draft.agent.clone(),
                action: draft.action.clone(),
                event_type: draft.event_type.clone(),
                event_category: draft.event_category.clone(),
                actor_id: draft.actor_id.clone(),
                status: draft.status.clone(),
                input_hash: draft.input_hash.clone(),
                output_hash: draft.output_hash.clone(),
                request_payload: draft.request_payload.clone(),
                response_summary: draft.response_summary.clone(),
                reasoning_chain: draft.reasoning_chain.clone(),
                prev_hash,
                entry_hash: String::new(),
            };
            entry.entry_hash = hash_entry(&entry);

            match self.store.append_if_head_matches(org, head.as_ref(), entry)? {
                AppendOutcome::Committed(committed) => {
                    info!(
                        org = %org,
                        sequence = committed.sequence,
                        entry_hash = %committed.entry_hash,
                        agent = %committed.agent,
                        action = %committed.action,
                        "audit entry committed"
                    );
                    return Ok(committed);
                }
                AppendOutcome::HeadConflict { actual } => {
                    // Another writer (a different process sharing the store)
                    // advanced the head between our read and our append.
                    warn!(
                        org = %org,
                        attempt,
                        actual_seq = actual.as_ref().map(|h| h.sequence),
                        "head moved during append; re-reading"
                    );
                }
            }
        }

        Err(LedgerError::Retryable {
            reason: format!(
                "append for org '{}' lost the head race {} times",
                org, self.config.max_append_attempts
            ),
        })
    }
}

// ── Draft validation ──────────────────────────────────────────────────────────

/// Reject malformed candidates before anything touches the lock or the
/// store. Classification fields are caller-owned vocabulary but must be
/// non-empty; caller-supplied digests must at least look like hex or
/// base64.
fn validate_draft(draft: &EntryDraft) -> LedgerResult<()> {
    let required = [
        ("agent", &draft.agent),
        ("action", &draft.action),
        ("event_type", &draft.event_type),
        ("event_category", &draft.event_category),
        ("status", &draft.status),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(LedgerError::Validation {
                reason: format!("{name} must not be empty"),
            });
        }
    }

    if let Some(actor) = &draft.actor_id {
        if actor.trim().is_empty() {
            return Err(LedgerError::Validation {
                reason: "actor_id, when present, must not be empty".to_string(),
            });
        }
    }

    if !is_well_formed_digest(&draft.input_hash) {
        return Err(LedgerError::Validation {
            reason: format!(
                "input_hash '{}' is neither well-formed hex nor base64",
                draft.input_hash
            ),
        });
    }
    if let Some(output_hash) = &draft.output_hash {
        if !is_well_formed_digest(output_hash) {
            return Err(LedgerError::Validation {
                reason: format!(
                    "output_hash '{output_hash}' is neither well-formed hex nor base64"
                ),
            });
        }
    }

    Ok(())
}

/// A digest is accepted as hex (even length, at least 32 chars, all hex
/// digits) or as base64 (padded length multiple of 4, base64 alphabet).
fn is_well_formed_digest(s: &str) -> bool {
    let looks_hex =
        s.len() >= 32 && s.len() % 2 == 0 && s.chars().all(|c| c.is_ascii_hexdigit());

    let looks_base64 = {
        let core = s.trim_end_matches('=');
        !core.is_empty()
            && s.len() % 4 == 0
            && s.len() - core.len() <= 2
            && core
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/')
    };

    looks_hex || looks_base64
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use custodia_contracts::EntryDraft;

    use super::{is_well_formed_digest, validate_draft};

    fn make_draft() -> EntryDraft {
        EntryDraft {
            agent: "rule-engine".to_string(),
            action: "execute_retention_rule".to_string(),
            event_type: "rule_executed".to_string(),
            event_category: "automation".to_string(),
            actor_id: None,
            status: "completed".to_string(),
            input_hash: "0f".repeat(32),
            output_hash: None,
            request_payload: json!({ "rule": "retention-90d" }),
            response_summary: json!({ "deleted": 4 }),
            reasoning_chain: json!([]),
        }
    }

    #[test]
    fn well_formed_draft_passes() {
        validate_draft(&make_draft()).unwrap();
    }

    #[test]
    fn empty_classification_field_is_rejected() {
        let mut draft = make_draft();
        draft.event_type = "  ".to_string();
        let err = validate_draft(&draft).unwrap_err();
        assert!(err.to_string().contains("event_type"));
    }

    #[test]
    fn empty_actor_id_is_rejected_when_present() {
        let mut draft = make_draft();
        draft.actor_id = Some(String::new());
        assert!(validate_draft(&draft).is_err());
    }

    #[test]
    fn garbage_input_hash_is_rejected() {
        let mut draft = make_draft();
        draft.input_hash = "not a digest!".to_string();
        let err = validate_draft(&draft).unwrap_err();
        assert!(err.to_string().contains("input_hash"));
    }

    #[test]
    fn digest_shapes() {
        // 64 hex chars (SHA-256).
        assert!(is_well_formed_digest(&"ab".repeat(32)));
        // Uppercase hex is still hex.
        assert!(is_well_formed_digest(&"AB".repeat(32)));
        // Standard base64 with padding.
        assert!(is_well_formed_digest("aGVsbG8gd29ybGQgdGhpcyBpcyBhIGRpZ2VzdA=="));
        // Too short for hex, not base64-shaped.
        assert!(!is_well_formed_digest("abcdef"));
        // Whitespace never belongs in a digest.
        assert!(!is_well_formed_digest("ab cd ef"));
        // Empty is malformed.
        assert!(!is_well_formed_digest(""));
    }
}
