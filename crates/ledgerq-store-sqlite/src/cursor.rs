// crates/ledgerq-store-sqlite/src/cursor.rs
// ============================================================================
// Module: SQLite Result Cursors
// Description: Buffered SQLite result sets exposed as result cursors.
// Purpose: Feed SQLite query results into the row materializer.
// Dependencies: ledgerq-core, rusqlite
// ============================================================================

//! ## Overview
//! A [`SqliteResultSet`] buffers every row of a query together with column
//! names and declared type names. Each call to [`SqliteResultSet::cursor`]
//! yields a fresh one-pass [`SqliteCursor`], so the same result can be
//! verified and then returned to the caller.
//!
//! SQLite is dynamically typed, so [`scan_value`] applies the coercions a SQL
//! driver applies when scanning into a typed destination.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ledgerq_core::CursorError;
use ledgerq_core::ResultCursor;
use ledgerq_core::ScalarKind;
use ledgerq_core::TypedScalar;
use ledgerq_core::scalar::timestamp_micros_from_rfc3339;
use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::Value;
use rusqlite::types::ValueRef;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Type name reported when neither SQLite nor the catalog declares one.
pub const UNDECLARED_TYPE_NAME: &str = "ANY";

// ============================================================================
// SECTION: Result Set
// ============================================================================

/// Fully buffered query result.
///
/// # Invariants
/// - `columns.len() == type_names.len()`, and every row has that many values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteResultSet {
    /// Result column names.
    columns: Vec<String>,
    /// Declared type name per column.
    type_names: Vec<String>,
    /// Buffered rows.
    rows: Vec<Vec<Value>>,
}

impl SqliteResultSet {
    /// Builds a result set from buffered parts.
    #[must_use]
    pub(crate) const fn new(
        columns: Vec<String>,
        type_names: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self {
            columns,
            type_names,
            rows,
        }
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the declared type names.
    #[must_use]
    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }

    /// Returns the number of buffered rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the result has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a fresh cursor positioned before the first row.
    #[must_use]
    pub const fn cursor(&self) -> SqliteCursor<'_> {
        SqliteCursor {
            set: self,
            position: None,
        }
    }
}

// ============================================================================
// SECTION: Cursor
// ============================================================================

/// One-pass cursor over a [`SqliteResultSet`].
#[derive(Debug, Clone)]
pub struct SqliteCursor<'a> {
    /// Backing result set.
    set: &'a SqliteResultSet,
    /// Index of the current row once advanced.
    position: Option<usize>,
}

impl ResultCursor for SqliteCursor<'_> {
    fn columns(&self) -> Result<Vec<String>, CursorError> {
        Ok(self.set.columns.clone())
    }

    fn column_type_names(&self) -> Result<Vec<String>, CursorError> {
        Ok(self.set.type_names.clone())
    }

    fn advance(&mut self) -> Result<bool, CursorError> {
        let next = self.position.map_or(0, |position| position.saturating_add(1));
        let has_row = next < self.set.rows.len();
        self.position = Some(next.min(self.set.rows.len()));
        Ok(has_row)
    }

    fn scan(&self, index: usize, kind: ScalarKind) -> Result<Option<TypedScalar>, CursorError> {
        let row = self
            .position
            .and_then(|position| self.set.rows.get(position))
            .ok_or(CursorError::NotPositioned)?;
        let value = row.get(index).ok_or(CursorError::ColumnOutOfRange(index))?;
        scan_value(value, kind, index)
    }
}

// ============================================================================
// SECTION: Value Decoding
// ============================================================================

/// Decodes a stored SQLite value into `kind`, `None` for SQL null.
///
/// # Errors
///
/// Returns [`CursorError::TypeMismatch`] when the value cannot represent `kind`.
pub fn scan_value(
    value: &Value,
    kind: ScalarKind,
    column: usize,
) -> Result<Option<TypedScalar>, CursorError> {
    let mismatch = || CursorError::TypeMismatch {
        column,
        expected: kind.as_str(),
        found: value_label(value),
    };
    let decoded = match (kind, value) {
        (_, Value::Null) => return Ok(None),
        (ScalarKind::String, Value::Text(text)) => TypedScalar::String(text.clone()),
        (ScalarKind::String, Value::Integer(number)) => TypedScalar::String(number.to_string()),
        (ScalarKind::String, Value::Real(number)) => TypedScalar::String(number.to_string()),
        (ScalarKind::String, Value::Blob(bytes)) => TypedScalar::String(
            String::from_utf8(bytes.clone()).map_err(|_| mismatch())?,
        ),
        (ScalarKind::Integer, Value::Integer(number)) => TypedScalar::Integer(*number),
        (ScalarKind::Integer, Value::Text(text)) => {
            TypedScalar::Integer(text.trim().parse().map_err(|_| mismatch())?)
        }
        (ScalarKind::Boolean, Value::Integer(number)) => TypedScalar::Boolean(*number != 0),
        (ScalarKind::Boolean, Value::Text(text)) => {
            TypedScalar::Boolean(parse_bool(text).ok_or_else(mismatch)?)
        }
        (ScalarKind::Bytes, Value::Blob(bytes)) => TypedScalar::Bytes(bytes.clone()),
        (ScalarKind::Bytes, Value::Text(text)) => TypedScalar::Bytes(text.as_bytes().to_vec()),
        (ScalarKind::Timestamp, Value::Integer(micros)) => TypedScalar::Timestamp(*micros),
        (ScalarKind::Timestamp, Value::Text(text)) => {
            TypedScalar::Timestamp(timestamp_micros_from_rfc3339(text).ok_or_else(mismatch)?)
        }
        _ => return Err(mismatch()),
    };
    Ok(Some(decoded))
}

/// Parses the textual boolean forms SQLite applications commonly store.
fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" => Some(true),
        "0" | "false" | "f" => Some(false),
        _ => None,
    }
}

/// Returns the storage class label of a value.
const fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}

// ============================================================================
// SECTION: Parameter Binding
// ============================================================================

/// Binds a [`TypedScalar`] as a SQLite parameter.
///
/// Booleans are stored as `0`/`1` and timestamps as microseconds.
#[derive(Debug, Clone, Copy)]
pub struct SqlParam<'a>(pub &'a TypedScalar);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            TypedScalar::String(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
            TypedScalar::Integer(number) | TypedScalar::Timestamp(number) => {
                ToSqlOutput::Owned(Value::Integer(*number))
            }
            TypedScalar::Boolean(flag) => ToSqlOutput::Owned(Value::Integer(i64::from(*flag))),
            TypedScalar::Bytes(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
            TypedScalar::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}
