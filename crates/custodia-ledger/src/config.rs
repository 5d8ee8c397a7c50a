//! Ledger configuration, loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid config.
//!
//! ```toml
//! lock_timeout_ms = 5000
//! max_append_attempts = 5
//! verify_progress_chunk = 1000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use custodia_contracts::{LedgerError, LedgerResult};

/// Tunables for the append protocol and verification runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// How long one append may wait for its organization's lock before
    /// failing with `Retryable`.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// How many head-conflict retries one append performs before failing
    /// with `Retryable`.
    #[serde(default = "default_max_append_attempts")]
    pub max_append_attempts: u32,

    /// How many entries a cancellable verification walks between progress
    /// callbacks and cancellation checks.
    #[serde(default = "default_verify_progress_chunk")]
    pub verify_progress_chunk: u64,
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_max_append_attempts() -> u32 {
    5
}

fn default_verify_progress_chunk() -> u64 {
    1_000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            max_append_attempts: default_max_append_attempts(),
            verify_progress_chunk: default_verify_progress_chunk(),
        }
    }
}

impl LedgerConfig {
    /// Parse a config from a TOML string and validate it.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| LedgerError::Config {
            reason: format!("failed to parse ledger config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file and validate it.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
            reason: format!("failed to read ledger config '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject configurations that would disable a required guarantee.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.lock_timeout_ms == 0 {
            return Err(LedgerError::Config {
                reason: "lock_timeout_ms must be at least 1".to_string(),
            });
        }
        if self.max_append_attempts == 0 {
            return Err(LedgerError::Config {
                reason: "max_append_attempts must be at least 1".to_string(),
            });
        }
        if self.verify_progress_chunk == 0 {
            return Err(LedgerError::Config {
                reason: "verify_progress_chunk must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The lock timeout as a `Duration`.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
