//! Hash-chain primitives: the pinned, versioned entry hash scheme.
//!
//! Scheme id: `custodia-sha256-v1`. The id is the first hash input, so a
//! future `-v2` scheme can coexist with chains written under this one.
//!
//! Hash input layout (bytes, in order). Every variable-length field is
//! preceded by its byte length as 8-byte little-endian, so no two distinct
//! field tuples can collide by concatenation. Optional fields carry a
//! presence byte (0x00 absent, 0x01 present + length + bytes).
//!
//!   1. scheme id as UTF-8
//!   2. id as 16 raw bytes (fixed width, no length prefix)
//!   3. organization_id as UTF-8
//!   4. sequence as 8-byte little-endian (fixed width, no length prefix)
//!   5. timestamp as RFC 3339 with nanoseconds
//!   6. agent, action, event_type, event_category as UTF-8
//!   7. actor_id (optional)
//!   8. status as UTF-8
//!   9. input_hash; output_hash (optional)
//!  10. canonical JSON (`serde_json::to_vec`) of request_payload,
//!      response_summary, reasoning_chain
//!  11. prev_hash (64 ASCII hex chars)
//!
//! The stored `entry_hash` field is never part of its own input.

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};

use custodia_contracts::AuditEntry;

/// Identifier of the hash scheme every entry in this repository is written
/// under. Folded into the hash input itself.
pub const HASH_SCHEME: &str = "custodia-sha256-v1";

fn update_len_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn update_str(hasher: &mut Sha256, s: &str) {
    update_len_prefixed(hasher, s.as_bytes());
}

fn update_opt_str(hasher: &mut Sha256, s: Option<&str>) {
    match s {
        Some(s) => {
            hasher.update([1u8]);
            update_str(hasher, s);
        }
        None => hasher.update([0u8]),
    }
}

fn update_json(hasher: &mut Sha256, value: &serde_json::Value) {
    // serde_json::to_vec produces deterministic output for the same Value:
    // no whitespace, map keys in stored order, which never changes once the
    // entry is built.
    let bytes =
        serde_json::to_vec(value).expect("serde_json::Value must always serialize to JSON");
    update_len_prefixed(hasher, &bytes);
}

/// Compute the `custodia-sha256-v1` hash for an entry.
///
/// Hashes every field of `entry` except `entry_hash` itself, per the layout
/// in the module docs. The appender calls this to seal a new entry; the
/// verifier calls it to recompute and compare.
///
/// Returns a lowercase 64-character hex string.
///
/// # Panics
///
/// Panics if a payload `Value` cannot be serialized to JSON — which cannot
/// happen for values built through `serde_json`.
pub fn hash_entry(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();

    update_str(&mut hasher, HASH_SCHEME);
    hasher.update(entry.id.as_bytes());
    update_str(&mut hasher, entry.organization_id.as_str());
    hasher.update(entry.sequence.to_le_bytes());
    update_str(
        &mut hasher,
        &entry.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
    );
    update_str(&mut hasher, &entry.agent);
    update_str(&mut hasher, &entry.action);
    update_str(&mut hasher, &entry.event_type);
    update_str(&mut hasher, &entry.event_category);
    update_opt_str(&mut hasher, entry.actor_id.as_deref());
    update_str(&mut hasher, &entry.status);
    update_str(&mut hasher, &entry.input_hash);
    update_opt_str(&mut hasher, entry.output_hash.as_deref());
    update_json(&mut hasher, &entry.request_payload);
    update_json(&mut hasher, &entry.response_summary);
    update_json(&mut hasher, &entry.reasoning_chain);
    update_str(&mut hasher, &entry.prev_hash);

    hex::encode(hasher.finalize())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
