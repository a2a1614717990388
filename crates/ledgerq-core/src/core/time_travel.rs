// crates/ledgerq-core/src/core/time_travel.rs
// ============================================================================
// Module: Time-Travel Directives
// Description: Transaction-bound snapshot qualifiers for table references.
// Purpose: Scope a query to the table state around a past transaction.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`TimeTravel`] directive pairs a transaction id with a [`TxMode`]. It is
//! attached to one statement's FROM clause, rendered exactly once when the
//! statement compiles, and dropped with the statement.
//!
//! - `BEFORE TX n` reads the state committed by transactions strictly before `n`.
//! - `AFTER TX n` reads the state as of the commit of transaction `n`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Mode
// ============================================================================

/// Snapshot boundary mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxMode {
    /// Exclude the named transaction and everything after it.
    Before,
    /// Include the named transaction, exclude everything after it.
    After,
}

impl TxMode {
    /// Returns the uppercase SQL keyword for the mode.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
        }
    }
}

// ============================================================================
// SECTION: Directive
// ============================================================================

/// Time-travel directive attached to a statement's table reference.
///
/// # Invariants
/// - Owned by a single statement; never shared across queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeTravel {
    /// Transaction identifier bounding the snapshot.
    tx_id: u64,
    /// Boundary mode.
    mode: TxMode,
}

impl TimeTravel {
    /// Creates a directive.
    #[must_use]
    pub const fn new(tx_id: u64, mode: TxMode) -> Self {
        Self {
            tx_id,
            mode,
        }
    }

    /// Returns the bounding transaction id.
    #[must_use]
    pub const fn tx_id(&self) -> u64 {
        self.tx_id
    }

    /// Returns the boundary mode.
    #[must_use]
    pub const fn mode(&self) -> TxMode {
        self.mode
    }
}

impl fmt::Display for TimeTravel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} TX {}", self.mode.keyword(), self.tx_id)
    }
}

/// Scopes a query to the state before transaction `tx_id`.
#[must_use]
pub const fn before_tx(tx_id: u64) -> TimeTravel {
    TimeTravel::new(tx_id, TxMode::Before)
}

/// Scopes a query to the state as of transaction `tx_id`.
#[must_use]
pub const fn after_tx(tx_id: u64) -> TimeTravel {
    TimeTravel::new(tx_id, TxMode::After)
}
