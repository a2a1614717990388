// crates/ledgerq-core/src/core/row.rs
// ============================================================================
// Module: Canonical Rows
// Description: Ordered, column-keyed, type-tagged result rows.
// Purpose: Represent one result row in the form the ledger verifies.
// Dependencies: crate::core::{column, scalar}, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`CanonicalRow`] pairs canonical column keys with typed values in cursor
//! order. Construction enforces the row invariants; the primary-key extractor
//! isolates the single value stored under the table's primary-key column.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::core::column::CanonicalColumnKey;
use crate::core::scalar::TypedScalar;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonical row errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// Column and value counts differ.
    #[error("row has {columns} columns but {values} values")]
    LengthMismatch {
        /// Number of column keys.
        columns: usize,
        /// Number of values.
        values: usize,
    },
    /// A column key appears more than once.
    #[error("duplicate column in row: {0}")]
    DuplicateColumn(String),
    /// No column matched the primary-key key.
    #[error("primary key not found: {0}")]
    PrimaryKeyNotFound(String),
}

// ============================================================================
// SECTION: Canonical Row
// ============================================================================

/// Materialized result row keyed by canonical column keys.
///
/// # Invariants
/// - `columns.len() == values.len()`.
/// - Column keys are unique within the row.
/// - Ordering matches the cursor's column order at materialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRow {
    /// Canonical column keys in cursor order.
    columns: Vec<CanonicalColumnKey>,
    /// Values aligned with `columns`.
    values: Vec<TypedScalar>,
}

impl CanonicalRow {
    /// Builds a row from aligned keys and values.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::LengthMismatch`] when the sequences differ in length
    /// and [`RowError::DuplicateColumn`] when a key repeats.
    pub fn new(
        columns: Vec<CanonicalColumnKey>,
        values: Vec<TypedScalar>,
    ) -> Result<Self, RowError> {
        if columns.len() != values.len() {
            return Err(RowError::LengthMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(RowError::DuplicateColumn(column.to_string()));
            }
        }
        Ok(Self {
            columns,
            values,
        })
    }

    /// Returns the column keys in order.
    #[must_use]
    pub fn columns(&self) -> &[CanonicalColumnKey] {
        &self.columns
    }

    /// Returns the values in column order.
    #[must_use]
    pub fn values(&self) -> &[TypedScalar] {
        &self.values
    }

    /// Returns the number of cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true when the row has no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &CanonicalColumnKey) -> Option<&TypedScalar> {
        self.iter().find(|(column, _)| *column == key).map(|(_, value)| value)
    }

    /// Iterates over `(key, value)` cells in order.
    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalColumnKey, &TypedScalar)> {
        self.columns.iter().zip(self.values.iter())
    }

    /// Extracts the primary-key value stored under `primary_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::PrimaryKeyNotFound`] when no column matches.
    pub fn primary_key(
        &self,
        primary_key: &CanonicalColumnKey,
    ) -> Result<PrimaryKeyValue, RowError> {
        extract_primary_key(self, primary_key)
    }
}

// ============================================================================
// SECTION: Primary Key Extraction
// ============================================================================

/// Single-value primary key isolated from a canonical row.
///
/// # Invariants
/// - Always holds exactly one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PrimaryKeyValue([TypedScalar; 1]);

impl PrimaryKeyValue {
    /// Wraps a single primary-key value.
    #[must_use]
    pub fn new(value: TypedScalar) -> Self {
        Self([value])
    }

    /// Returns the key as a one-element slice.
    #[must_use]
    pub fn as_slice(&self) -> &[TypedScalar] {
        &self.0
    }

    /// Returns the key value.
    #[must_use]
    pub const fn value(&self) -> &TypedScalar {
        &self.0[0]
    }
}

/// Returns the value under `primary_key`, matching keys by exact equality.
///
/// The first match wins. Duplicate keys cannot occur in a well-formed row.
///
/// # Errors
///
/// Returns [`RowError::PrimaryKeyNotFound`] when no column matches.
pub fn extract_primary_key(
    row: &CanonicalRow,
    primary_key: &CanonicalColumnKey,
) -> Result<PrimaryKeyValue, RowError> {
    row.get(primary_key)
        .cloned()
        .map(PrimaryKeyValue::new)
        .ok_or_else(|| RowError::PrimaryKeyNotFound(primary_key.to_string()))
}
