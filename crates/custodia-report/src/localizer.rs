//! Break localization: formatting verification reports for consumers.
//!
//! Pure presentation — no verification logic lives here. The narrative is
//! written for compliance officers reading an audit screen; the offending
//! entry list is the machine-readable side for audit UIs and exports.

use serde::{Deserialize, Serialize};

use custodia_contracts::{BreakType, OrgId, VerificationReport};

/// One offending `(organization, sequence)` pair for downstream UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffendingEntry {
    pub organization_id: OrgId,
    pub sequence: u64,
    pub break_type: BreakType,
}

/// Extract the machine-readable list of offending positions.
///
/// One element per finding, in walk order. An intact report yields an
/// empty list.
pub fn offending_entries(report: &VerificationReport) -> Vec<OffendingEntry> {
    report
        .details
        .iter()
        .map(|d| OffendingEntry {
            organization_id: report.organization_id.clone(),
            sequence: d.position,
            break_type: d.break_type,
        })
        .collect()
}

/// Render a human-readable account of one verification run.
pub fn narrative(report: &VerificationReport) -> String {
    let mut out = String::new();

    let coverage = match report.range {
        Some((from, to)) => format!("entries {from}..={to}"),
        None => "no entries".to_string(),
    };

    if report.valid {
        out.push_str(&format!(
            "Audit chain for organization '{}' is intact: {} verified ({}).",
            report.organization_id, report.total_entries, coverage
        ));
    } else {
        out.push_str(&format!(
            "Audit chain for organization '{}' is BROKEN: {} finding(s) across {} examined entries ({}).\n",
            report.organization_id,
            report.details.len(),
            report.total_entries,
            coverage
        ));
        for detail in &report.details {
            out.push_str(&format!(
                "  - position {}: {} — {}\n",
                detail.position,
                detail.break_type,
                describe(detail.break_type, &detail.expected, &detail.found)
            ));
        }
        if let Some(first) = report.first_broken_position {
            out.push_str(&format!(
                "  Entries from position {} onward cannot be trusted without further investigation.",
                first
            ));
        }
    }

    if !report.anchored {
        out.push_str(
            "\nNote: this was an unanchored partial verification; only a full run from the genesis entry is authoritative.",
        );
    }
    if report.cancelled {
        out.push_str("\nNote: verification was cancelled before reaching the chain head.");
    }

    out
}

/// One finding, in words. Hashes are shortened — the full values stay in
/// the structured report.
fn describe(break_type: BreakType, expected: &str, found: &str) -> String {
    match break_type {
        BreakType::SelfHashMismatch => format!(
            "the stored entry was modified after commit (stored hash {}, recomputed {})",
            short(found),
            short(expected)
        ),
        BreakType::LinkMismatch => format!(
            "the link to the previous entry is wrong (stored prev_hash {}, expected {})",
            short(found),
            short(expected)
        ),
        BreakType::MissingSequenceGap => {
            format!("an entry was deleted ({found} where {expected} was expected)")
        }
        BreakType::GenesisMismatch => format!(
            "the first entry does not link to the genesis sentinel (stored prev_hash {})",
            short(found)
        ),
    }
}

fn short(hash: &str) -> String {
    if hash.len() > 12 {
        format!("{}…", &hash[..12])
    } else {
        hash.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
