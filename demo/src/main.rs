//! CUSTODIA Audit Ledger — Demo CLI
//!
//! Runs one or all of the ledger scenarios against real components
//! (in-memory chain store, hash-chain appender, verifier, reporter).
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- append-verify
//!   cargo run -p demo -- tamper
//!   cargo run -p demo -- gap
//!   cargo run -p demo -- concurrent

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

use custodia_contracts::{EntryDraft, LedgerResult, OrgId};
use custodia_ledger::{HashChainAppender, LedgerConfig};
use custodia_report::{narrative, offending_entries};
use custodia_store::InMemoryChainStore;
use custodia_verify::ChainVerifier;

// ── CLI definition ────────────────────────────────────────────────────────────

/// CUSTODIA — tamper-evident audit ledger demo.
///
/// Each subcommand runs one or all of the ledger scenarios, demonstrating
/// hash-chain appends, break localization, and multi-tenant concurrency.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "CUSTODIA audit ledger demo",
    long_about = "Runs CUSTODIA ledger scenarios showing hash-chained appends,\n\
                  tamper and deletion detection, and per-organization concurrency."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all scenarios in sequence.
    RunAll,
    /// Scenario 1: append entries across modules, then verify the chain.
    AppendVerify,
    /// Scenario 2: edit a stored row directly and localize the break.
    Tamper,
    /// Scenario 3: delete a stored row and detect the sequence gap.
    Gap,
    /// Scenario 4: concurrent appends across organizations, then verify all.
    Concurrent,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::AppendVerify => run_append_verify(),
        Command::Tamper => run_tamper(),
        Command::Gap => run_gap(),
        Command::Concurrent => run_concurrent(),
    };

    match result {
        Ok(()) => println!("\nAll selected scenarios completed successfully."),
        Err(e) => {
            eprintln!("Demo error: {e}");
            std::process::exit(1);
        }
    }
}

fn run_all() -> LedgerResult<()> {
    run_append_verify()?;
    run_tamper()?;
    run_gap()?;
    run_concurrent()
}

// ── Shared wiring ─────────────────────────────────────────────────────────────

struct Ledger {
    store: Arc<InMemoryChainStore>,
    appender: Arc<HashChainAppender<InMemoryChainStore>>,
    verifier: ChainVerifier<InMemoryChainStore>,
}

fn wire_ledger() -> Ledger {
    let store = Arc::new(InMemoryChainStore::new());
    let config = LedgerConfig::default();
    Ledger {
        appender: Arc::new(HashChainAppender::new(Arc::clone(&store), config.clone())),
        verifier: ChainVerifier::with_config(Arc::clone(&store), &config),
        store,
    }
}

/// What a real compliance module would do before submitting: hash its own
/// request body and carry the digest in the draft.
fn draft(agent: &str, action: &str, category: &str, payload: serde_json::Value) -> EntryDraft {
    let input_hash = hex::encode(Sha256::digest(payload.to_string().as_bytes()));
    EntryDraft {
        agent: agent.to_string(),
        action: action.to_string(),
        event_type: format!("{action}_completed"),
        event_category: category.to_string(),
        actor_id: Some("officer-lindqvist".to_string()),
        status: "completed".to_string(),
        input_hash,
        output_hash: None,
        request_payload: payload,
        response_summary: json!({ "ok": true }),
        reasoning_chain: json!([]),
    }
}

fn seed_org(ledger: &Ledger, org: &OrgId) -> LedgerResult<()> {
    let actions = [
        ("risk-assessment", "score_vendor_model", "ai-risk", json!({ "model": "vendor-x/classifier" })),
        ("dsr-handler", "export_subject_data", "privacy", json!({ "subject": "s-4711" })),
        ("rule-engine", "execute_retention_rule", "automation", json!({ "rule": "retention-90d" })),
        ("esg-reporting", "compile_scope2_figures", "esg", json!({ "period": "2026-Q2" })),
    ];
    for (agent, action, category, payload) in actions {
        let committed = ledger.appender.append(org, draft(agent, action, category, payload))?;
        println!(
            "  appended #{} {} / {} (hash {}…)",
            committed.sequence,
            committed.agent,
            committed.action,
            &committed.entry_hash[..12]
        );
    }
    Ok(())
}

// ── Scenario 1: append + verify ───────────────────────────────────────────────

fn run_append_verify() -> LedgerResult<()> {
    println!("\n=== Scenario 1: append entries, verify the chain ===");
    let ledger = wire_ledger();
    let org = OrgId::new("org-acme");

    seed_org(&ledger, &org)?;

    let report = ledger.verifier.verify(&org)?;
    println!("\n{}", narrative(&report));
    Ok(())
}

// ── Scenario 2: tamper detection ──────────────────────────────────────────────

fn run_tamper() -> LedgerResult<()> {
    println!("\n=== Scenario 2: direct storage edit is localized ===");
    let ledger = wire_ledger();
    let org = OrgId::new("org-acme");

    seed_org(&ledger, &org)?;

    println!("\n  [storage bypass] rewriting status of entry #2 …");
    ledger
        .store
        .tamper_entry(&org, 2, |e| e.status = "falsified".to_string())?;

    let report = ledger.verifier.verify(&org)?;
    println!("\n{}", narrative(&report));

    println!("\n  machine-readable findings for the audit UI:");
    for pair in offending_entries(&report) {
        println!(
            "    {{ org: {}, sequence: {}, break: {} }}",
            pair.organization_id, pair.sequence, pair.break_type
        );
    }
    Ok(())
}

// ── Scenario 3: deletion detection ────────────────────────────────────────────

fn run_gap() -> LedgerResult<()> {
    println!("\n=== Scenario 3: deleted row leaves a detectable gap ===");
    let ledger = wire_ledger();
    let org = OrgId::new("org-acme");

    seed_org(&ledger, &org)?;

    println!("\n  [storage bypass] deleting entry #3 …");
    ledger.store.remove_entry(&org, 3)?;

    let report = ledger.verifier.verify(&org)?;
    println!("\n{}", narrative(&report));
    Ok(())
}

// ── Scenario 4: multi-tenant concurrency ──────────────────────────────────────

fn run_concurrent() -> LedgerResult<()> {
    println!("\n=== Scenario 4: concurrent appends across organizations ===");
    let ledger = wire_ledger();
    let orgs = ["org-acme", "org-globex", "org-initech"];

    let handles: Vec<_> = orgs
        .iter()
        .map(|org_name| {
            let appender = Arc::clone(&ledger.appender);
            let org = OrgId::new(*org_name);
            std::thread::spawn(move || -> LedgerResult<()> {
                for i in 0..25 {
                    appender.append(
                        &org,
                        draft(
                            "rule-engine",
                            "execute_retention_rule",
                            "automation",
                            json!({ "batch": i }),
                        ),
                    )?;
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .expect("appender thread panicked")?;
    }

    for org_name in orgs {
        let org = OrgId::new(org_name);
        let report = ledger.verifier.verify(&org)?;
        println!("  {}", narrative(&report));
    }
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("CUSTODIA — Tamper-Evident Audit Ledger");
    println!("======================================");
    println!();
    println!("Append protocol per entry:");
    println!("  [1] Validate the candidate (classification fields, digest shapes)");
    println!("  [2] Acquire the organization's lock (bounded timeout)");
    println!("  [3] Read the chain head, assign sequence and prev_hash");
    println!("  [4] Seal with SHA-256 over the canonical field layout");
    println!("  [5] Compare-and-append at the store; retry if the head moved");
}
