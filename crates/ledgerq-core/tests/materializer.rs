// crates/ledgerq-core/tests/materializer.rs
// ============================================================================
// Module: Row Materializer Tests
// Description: Tests for typed row materialization from result cursors.
// ============================================================================
//! ## Overview
//! Drives the materializer over an in-memory cursor to check type mapping,
//! null handling, and error classification.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use ledgerq_core::CanonicalColumnKey;
use ledgerq_core::CursorError;
use ledgerq_core::MaterializeError;
use ledgerq_core::ResultCursor;
use ledgerq_core::ScalarKind;
use ledgerq_core::TypedScalar;
use ledgerq_core::materialize_rows;
use ledgerq_core::runtime::rows;

// ============================================================================
// SECTION: In-Memory Cursor
// ============================================================================

struct VecCursor {
    columns: Vec<String>,
    type_names: Vec<String>,
    rows: Vec<Vec<TypedScalar>>,
    position: Option<usize>,
    fail_metadata: bool,
}

impl VecCursor {
    fn new(columns: &[(&str, &str)], rows: Vec<Vec<TypedScalar>>) -> Self {
        Self {
            columns: columns.iter().map(|(name, _)| (*name).to_string()).collect(),
            type_names: columns.iter().map(|(_, type_name)| (*type_name).to_string()).collect(),
            rows,
            position: None,
            fail_metadata: false,
        }
    }
}

impl ResultCursor for VecCursor {
    fn columns(&self) -> Result<Vec<String>, CursorError> {
        if self.fail_metadata {
            return Err(CursorError::Metadata("closed".to_string()));
        }
        Ok(self.columns.clone())
    }

    fn column_type_names(&self) -> Result<Vec<String>, CursorError> {
        Ok(self.type_names.clone())
    }

    fn advance(&mut self) -> Result<bool, CursorError> {
        let next = self.position.map_or(0, |position| position + 1);
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn scan(&self, index: usize, _kind: ScalarKind) -> Result<Option<TypedScalar>, CursorError> {
        let row = self.position.and_then(|position| self.rows.get(position));
        let row = row.ok_or(CursorError::NotPositioned)?;
        let value = row.get(index).ok_or(CursorError::ColumnOutOfRange(index))?;
        Ok(if value.is_null() { None } else { Some(value.clone()) })
    }
}

fn entity_cursor(rows: Vec<Vec<TypedScalar>>) -> VecCursor {
    VecCursor::new(
        &[("id", "INTEGER"), ("name", "VARCHAR[64]"), ("active", "BOOLEAN"), ("blob", "BLOB")],
        rows,
    )
}

fn key(column: &str) -> CanonicalColumnKey {
    CanonicalColumnKey::new("ledgerdb", "entities", column)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn materializes_every_row_with_canonical_keys() {
    let mut cursor = entity_cursor(vec![
        vec![
            TypedScalar::Integer(1),
            TypedScalar::from("ada"),
            TypedScalar::Boolean(true),
            TypedScalar::Bytes(vec![1, 2]),
        ],
        vec![
            TypedScalar::Integer(2),
            TypedScalar::from("grace"),
            TypedScalar::Boolean(false),
            TypedScalar::Bytes(vec![3]),
        ],
    ]);
    let rows = materialize_rows(&mut cursor, "ledgerdb", "entities").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].columns()[0], key("id"));
    assert_eq!(rows[0].get(&key("name")), Some(&TypedScalar::from("ada")));
    assert_eq!(rows[1].get(&key("id")), Some(&TypedScalar::Integer(2)));
    assert_eq!(rows[1].get(&key("active")), Some(&TypedScalar::Boolean(false)));
    assert_eq!(rows[1].get(&key("blob")), Some(&TypedScalar::Bytes(vec![3])));
}

#[test]
fn empty_bytes_and_missing_values_become_null() {
    let mut cursor = entity_cursor(vec![vec![
        TypedScalar::Integer(1),
        TypedScalar::Null,
        TypedScalar::Null,
        TypedScalar::Bytes(Vec::new()),
    ]]);
    let rows = materialize_rows(&mut cursor, "ledgerdb", "entities").unwrap();
    assert_eq!(rows[0].get(&key("name")), Some(&TypedScalar::Null));
    assert_eq!(rows[0].get(&key("active")), Some(&TypedScalar::Null));
    assert_eq!(rows[0].get(&key("blob")), Some(&TypedScalar::Null));
}

#[test]
fn empty_result_materializes_no_rows() {
    let mut cursor = entity_cursor(Vec::new());
    let rows = materialize_rows(&mut cursor, "ledgerdb", "entities").unwrap();
    assert!(rows.is_empty());
}

#[test]
fn kind_mismatch_is_a_scan_error() {
    let mut cursor = VecCursor::new(&[("id", "INTEGER")], vec![vec![TypedScalar::from("one")]]);
    let result = materialize_rows(&mut cursor, "ledgerdb", "entities");
    assert!(matches!(result, Err(MaterializeError::Scan(_))));
}

#[test]
fn metadata_failure_is_an_introspection_error() {
    let mut cursor = entity_cursor(Vec::new());
    cursor.fail_metadata = true;
    let result = materialize_rows(&mut cursor, "ledgerdb", "entities");
    assert!(matches!(result, Err(MaterializeError::ColumnIntrospection(_))));
}

#[test]
fn mismatched_metadata_lengths_are_rejected() {
    let mut cursor = entity_cursor(Vec::new());
    cursor.type_names.pop();
    let result = materialize_rows(&mut cursor, "ledgerdb", "entities");
    assert!(matches!(result, Err(MaterializeError::ColumnIntrospection(_))));
}

#[test]
fn duplicate_column_names_are_rejected() {
    let mut cursor = VecCursor::new(&[("id", "INTEGER"), ("id", "INTEGER")], Vec::new());
    let result = materialize_rows(&mut cursor, "ledgerdb", "entities");
    assert!(matches!(result, Err(MaterializeError::ColumnIntrospection(_))));
}

#[test]
fn row_iterator_stops_after_first_error() {
    let mut cursor = VecCursor::new(
        &[("id", "INTEGER")],
        vec![
            vec![TypedScalar::Integer(1)],
            vec![TypedScalar::Boolean(true)],
            vec![TypedScalar::Integer(3)],
        ],
    );
    let results: Vec<_> = rows(&mut cursor, "ledgerdb", "entities").unwrap().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(MaterializeError::Scan(_))));
}

#[test]
fn row_iterator_exposes_keys_before_the_first_row() {
    let mut cursor = entity_cursor(Vec::new());
    let iter = rows(&mut cursor, "ledgerdb", "entities").unwrap();
    assert_eq!(iter.keys(), [key("id"), key("name"), key("active"), key("blob")]);
    assert_eq!(iter.count(), 0);
}
