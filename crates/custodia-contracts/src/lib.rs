//! # custodia-contracts
//!
//! Shared types and error taxonomy for the CUSTODIA audit ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions, report types, and error types.

pub mod entry;
pub mod error;
pub mod report;

pub use entry::{AuditEntry, ChainHead, EntryDraft, OrgId};
pub use error::{LedgerError, LedgerResult};
pub use report::{BreakDetail, BreakType, VerificationReport};
