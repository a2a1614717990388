// crates/ledgerq-core/src/core/column.rs
// ============================================================================
// Module: Column Canonicalizer
// Description: Fully-qualified textual keys for result columns.
// Purpose: Join materialized rows and primary-key lookup on one key format.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every column in a canonical row is labelled `(database.table.column)`. The
//! same constructor labels materialized cells and builds the primary-key
//! search key, so the two can never drift apart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Canonical Column Key
// ============================================================================

/// Canonical `(database.table.column)` key.
///
/// # Invariants
/// - Identical `(database, table, column)` triples always produce identical keys.
/// - Distinct column names within one table produce distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalColumnKey(String);

impl CanonicalColumnKey {
    /// Derives the canonical key for a column.
    #[must_use]
    pub fn new(database: &str, table: &str, column: &str) -> Self {
        let mut key = String::with_capacity(database.len() + table.len() + column.len() + 4);
        key.push('(');
        key.push_str(database);
        key.push('.');
        key.push_str(table);
        key.push('.');
        key.push_str(column);
        key.push(')');
        Self(key)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalColumnKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
