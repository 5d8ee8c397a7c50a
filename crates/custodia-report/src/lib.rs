//! # custodia-report
//!
//! Break localization and reporting for CUSTODIA verification results.
//!
//! Converts a `VerificationReport` into a human-readable narrative for
//! compliance officers and a machine-readable list of offending
//! `(organization, sequence)` pairs for audit UIs and exports. Performs no
//! verification of its own — that is `custodia-verify`'s job.

pub mod localizer;

pub use localizer::{narrative, offending_entries, OffendingEntry};
