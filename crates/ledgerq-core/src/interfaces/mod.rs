// crates/ledgerq-core/src/interfaces/mod.rs
// ============================================================================
// Module: ledgerq Interfaces
// Description: Backend-agnostic result cursor and ledger client contracts.
// Purpose: Define the seams between the query layer and the ledger backend.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! A [`ResultCursor`] exposes a positioned result set with column metadata.
//! A [`LedgerClient`] answers table descriptions and row verification
//! requests. Implementations fail closed: anything the ledger cannot prove is
//! reported as an error, never as success.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::row::CanonicalRow;
use crate::core::row::PrimaryKeyValue;
use crate::core::scalar::ScalarKind;
use crate::core::scalar::TypedScalar;
use crate::core::schema::TableDescription;

// ============================================================================
// SECTION: Result Cursor
// ============================================================================

/// Result cursor errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// Column metadata is unavailable.
    #[error("column metadata unavailable: {0}")]
    Metadata(String),
    /// The cursor could not advance.
    #[error("cursor fetch failed: {0}")]
    Fetch(String),
    /// The cursor is not positioned on a row.
    #[error("cursor is not positioned on a row")]
    NotPositioned,
    /// The column index is out of range.
    #[error("column index {0} out of range")]
    ColumnOutOfRange(usize),
    /// The stored value does not decode into the requested kind.
    #[error("column {column} holds {found}, expected {expected}")]
    TypeMismatch {
        /// Column index.
        column: usize,
        /// Requested kind label.
        expected: &'static str,
        /// Stored value label.
        found: &'static str,
    },
}

/// Positioned result set with column metadata.
pub trait ResultCursor {
    /// Returns the result column names in order.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Metadata`] when names are unavailable.
    fn columns(&self) -> Result<Vec<String>, CursorError>;

    /// Returns the database type name of each result column in order.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Metadata`] when types are unavailable.
    fn column_type_names(&self) -> Result<Vec<String>, CursorError>;

    /// Advances to the next row, returning false when exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Fetch`] when the next row cannot be fetched.
    fn advance(&mut self) -> Result<bool, CursorError>;

    /// Decodes the value at `index` of the current row, `None` for null.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError`] when the value is absent or of another kind.
    fn scan(&self, index: usize, kind: ScalarKind) -> Result<Option<TypedScalar>, CursorError>;
}

// ============================================================================
// SECTION: Ledger Client
// ============================================================================

/// Message a ledger reports when stored data fails its integrity check.
pub const CORRUPTED_DATA_MESSAGE: &str = "data is corrupted";

/// Ledger client errors.
///
/// # Invariants
/// - Integrity failures are reported as [`LedgerError::DataCorrupted`], or as
///   [`LedgerError::Remote`] carrying exactly [`CORRUPTED_DATA_MESSAGE`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Stored data failed its integrity check.
    #[error("data is corrupted")]
    DataCorrupted,
    /// Table is unknown to the ledger.
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// Database is unknown to the ledger.
    #[error("database not found: {0}")]
    DatabaseNotFound(String),
    /// No stored version exists for the primary key.
    #[error("row not found: {0}")]
    RowNotFound(String),
    /// Ledger reported an error by message.
    #[error("{0}")]
    Remote(String),
    /// Transport or storage failure.
    #[error("ledger io error: {0}")]
    Io(String),
}

impl LedgerError {
    /// Returns true when the error reports a failed integrity check.
    #[must_use]
    pub fn is_data_corrupted(&self) -> bool {
        match self {
            Self::DataCorrupted => true,
            Self::Remote(message) => message == CORRUPTED_DATA_MESSAGE,
            _ => false,
        }
    }
}

/// Tamper-evident ledger backend.
pub trait LedgerClient: Send + Sync {
    /// Describes a table in `database`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the table or database is unknown.
    fn describe_table(&self, database: &str, table: &str)
    -> Result<TableDescription, LedgerError>;

    /// Proves that `row` matches the ledger's latest committed version of the
    /// row keyed by `primary_key`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DataCorrupted`] when the proof fails and other
    /// [`LedgerError`] variants when the row cannot be checked.
    fn verify_row(
        &self,
        database: &str,
        row: &CanonicalRow,
        table: &str,
        primary_key: &PrimaryKeyValue,
    ) -> Result<(), LedgerError>;
}

// ============================================================================
// SECTION: Capability Gaps
// ============================================================================

/// Operations the ledger backend does not support.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Operation is not available on the ledger.
    #[error("not implemented")]
    NotImplemented,
    /// Constraint management is not available on the ledger.
    #[error("constraints not implemented")]
    ConstraintsNotImplemented,
    /// Row deletion is not available on the ledger.
    #[error("delete not implemented")]
    DeleteNotImplemented,
}
