//! # custodia-store
//!
//! Durable, ordered, append-only persistence for the CUSTODIA audit ledger.
//!
//! This crate provides:
//! - The `ChainStore` trait — the storage contract the appender and the
//!   verifier are written against
//! - `InMemoryChainStore` — the reference implementation, and the storage
//!   bypass methods used to simulate tampering in tests and demos

pub mod memory;
pub mod traits;

pub use memory::InMemoryChainStore;
pub use traits::{AppendOutcome, ChainStore};

// ── Tests ─────────────────────────────────────────────────────────────────────
