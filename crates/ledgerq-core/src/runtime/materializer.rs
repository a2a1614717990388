// crates/ledgerq-core/src/runtime/materializer.rs
// ============================================================================
// Module: Row Materializer
// Description: Converts a positioned result cursor into canonical rows.
// Purpose: Produce the exact row form the ledger verifies.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! [`CanonicalRows`] reads column metadata once, then yields one
//! [`CanonicalRow`] per cursor row. Each column is decoded into the scalar
//! kind mapped from its database type name.
//!
//! Null handling: a null cell becomes [`TypedScalar::Null`], and so does a
//! zero-length byte value. Empty and null blobs are therefore
//! indistinguishable after materialization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::column::CanonicalColumnKey;
use crate::core::row::CanonicalRow;
use crate::core::scalar::ScalarKind;
use crate::core::scalar::TypedScalar;
use crate::interfaces::ResultCursor;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Row materialization errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterializeError {
    /// Column names or types are unavailable or inconsistent.
    #[error("column introspection failed: {0}")]
    ColumnIntrospection(String),
    /// A row could not be fetched or decoded.
    #[error("row scan failed: {0}")]
    Scan(String),
}

// ============================================================================
// SECTION: Materializer
// ============================================================================

/// One-pass iterator over canonical rows read from a cursor.
///
/// # Invariants
/// - Column keys and kinds are fixed when the iterator is created.
/// - Iteration stops after the first error.
pub struct CanonicalRows<'a, C: ResultCursor + ?Sized> {
    /// Source cursor.
    cursor: &'a mut C,
    /// Canonical key per column.
    keys: Vec<CanonicalColumnKey>,
    /// Decode kind per column.
    kinds: Vec<ScalarKind>,
    /// Set after exhaustion or the first error.
    done: bool,
}

impl<C: ResultCursor + ?Sized> std::fmt::Debug for CanonicalRows<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalRows")
            .field("keys", &self.keys)
            .field("kinds", &self.kinds)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

/// Starts materializing `cursor` for `table` in `database`.
///
/// # Errors
///
/// Returns [`MaterializeError::ColumnIntrospection`] when column names or
/// types cannot be read, differ in count, or map to duplicate keys.
pub fn rows<'a, C: ResultCursor + ?Sized>(
    cursor: &'a mut C,
    database: &str,
    table: &str,
) -> Result<CanonicalRows<'a, C>, MaterializeError> {
    let names = cursor
        .columns()
        .map_err(|err| MaterializeError::ColumnIntrospection(err.to_string()))?;
    let type_names = cursor
        .column_type_names()
        .map_err(|err| MaterializeError::ColumnIntrospection(err.to_string()))?;
    if names.len() != type_names.len() {
        return Err(MaterializeError::ColumnIntrospection(format!(
            "{} column names but {} column types",
            names.len(),
            type_names.len()
        )));
    }
    let keys: Vec<CanonicalColumnKey> =
        names.iter().map(|name| CanonicalColumnKey::new(database, table, name)).collect();
    for (index, key) in keys.iter().enumerate() {
        if keys[.. index].contains(key) {
            return Err(MaterializeError::ColumnIntrospection(format!("duplicate column {key}")));
        }
    }
    let kinds = type_names.iter().map(|name| ScalarKind::from_type_name(name)).collect();
    Ok(CanonicalRows {
        cursor,
        keys,
        kinds,
        done: false,
    })
}

/// Materializes every remaining row of `cursor`.
///
/// # Errors
///
/// Returns [`MaterializeError`] on the first introspection or scan failure.
pub fn materialize_rows<C: ResultCursor + ?Sized>(
    cursor: &mut C,
    database: &str,
    table: &str,
) -> Result<Vec<CanonicalRow>, MaterializeError> {
    rows(cursor, database, table)?.collect()
}

impl<C: ResultCursor + ?Sized> CanonicalRows<'_, C> {
    /// Returns the canonical column keys.
    #[must_use]
    pub fn keys(&self) -> &[CanonicalColumnKey] {
        &self.keys
    }

    /// Decodes the current cursor row.
    fn read_row(&self) -> Result<CanonicalRow, MaterializeError> {
        let mut values = Vec::with_capacity(self.kinds.len());
        for (index, kind) in self.kinds.iter().enumerate() {
            let value = self
                .cursor
                .scan(index, *kind)
                .map_err(|err| MaterializeError::Scan(err.to_string()))?;
            values.push(normalize(value, *kind, index)?);
        }
        CanonicalRow::new(self.keys.clone(), values)
            .map_err(|err| MaterializeError::ColumnIntrospection(err.to_string()))
    }
}

impl<C: ResultCursor + ?Sized> Iterator for CanonicalRows<'_, C> {
    type Item = Result<CanonicalRow, MaterializeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match self.cursor.advance() {
            Ok(false) => None,
            Ok(true) => Some(self.read_row()),
            Err(err) => Some(Err(MaterializeError::Scan(err.to_string()))),
        };
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Applies null rules and checks the decoded kind.
fn normalize(
    value: Option<TypedScalar>,
    kind: ScalarKind,
    index: usize,
) -> Result<TypedScalar, MaterializeError> {
    let Some(value) = value else {
        return Ok(TypedScalar::Null);
    };
    match value.kind() {
        None => Ok(TypedScalar::Null),
        Some(found) if found != kind => Err(MaterializeError::Scan(format!(
            "column {index} decoded as {}, expected {}",
            found.as_str(),
            kind.as_str()
        ))),
        Some(_) => match value {
            TypedScalar::Bytes(bytes) if bytes.is_empty() => Ok(TypedScalar::Null),
            other => Ok(other),
        },
    }
}
