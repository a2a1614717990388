// crates/ledgerq-core/src/core/session.rs
// ============================================================================
// Module: Session Settings
// Description: Per-session database and verification settings.
// Purpose: Carry the verify flag and database name into the query hooks.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`SessionConfig`] is read once when a session is opened. When `verify` is
//! enabled every query result is re-read and checked against the ledger.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Database name used when none is configured.
pub const DEFAULT_DATABASE: &str = "defaultdb";

/// Returns the default database name for serde.
fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

// ============================================================================
// SECTION: Session Config
// ============================================================================

/// Session-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Database name used in canonical column keys and ledger calls.
    #[serde(default = "default_database")]
    pub database: String,
    /// Verify every query result against the ledger.
    #[serde(default)]
    pub verify: bool,
}

impl SessionConfig {
    /// Returns settings for `database` with verification disabled.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            verify: false,
        }
    }

    /// Enables or disables verification.
    #[must_use]
    pub const fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}
