// crates/ledgerq-core/tests/proptest_canonical.rs
// ============================================================================
// Module: Canonical Key Property-Based Tests
// Description: Property tests for canonical column keys and type mapping.
// Purpose: Detect collisions and panics across wide identifier ranges.
// ============================================================================

//! Property-based tests for canonical key derivation and scalar-kind mapping.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use ledgerq_core::CanonicalColumnKey;
use ledgerq_core::CanonicalRow;
use ledgerq_core::RowError;
use ledgerq_core::ScalarKind;
use ledgerq_core::TypedScalar;
use ledgerq_core::extract_primary_key;
use proptest::prelude::*;

fn identifier_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,24}"
}

#[test]
fn canonical_key_wraps_dotted_triple() {
    let key = CanonicalColumnKey::new("ledgerdb", "entities", "id");
    assert_eq!(key.as_str(), "(ledgerdb.entities.id)");
    assert_eq!(key.to_string(), "(ledgerdb.entities.id)");
}

#[test]
fn type_names_map_to_scalar_kinds() {
    let cases = [
        ("INTEGER", ScalarKind::Integer),
        ("integer", ScalarKind::Integer),
        ("INTEGER AUTO_INCREMENT", ScalarKind::Integer),
        ("BOOLEAN", ScalarKind::Boolean),
        ("BLOB", ScalarKind::Bytes),
        ("BLOB[256]", ScalarKind::Bytes),
        ("TIMESTAMP", ScalarKind::Timestamp),
        ("VARCHAR", ScalarKind::String),
        ("VARCHAR[64]", ScalarKind::String),
        ("VARCHAR(64)", ScalarKind::String),
        ("ANY", ScalarKind::String),
        ("", ScalarKind::String),
        ("JSON", ScalarKind::String),
    ];
    for (type_name, expected) in cases {
        assert_eq!(ScalarKind::from_type_name(type_name), expected, "type {type_name}");
    }
}

#[test]
fn primary_key_requires_exact_key_match() {
    let row = CanonicalRow::new(
        vec![CanonicalColumnKey::new("db", "t", "id"), CanonicalColumnKey::new("db", "t", "name")],
        vec![TypedScalar::Integer(7), TypedScalar::from("ada")],
    )
    .unwrap();
    let found = extract_primary_key(&row, &CanonicalColumnKey::new("db", "t", "id")).unwrap();
    assert_eq!(found.value(), &TypedScalar::Integer(7));
    assert_eq!(found.as_slice(), [TypedScalar::Integer(7)]);
    let other_table = extract_primary_key(&row, &CanonicalColumnKey::new("db", "u", "id"));
    assert_eq!(other_table, Err(RowError::PrimaryKeyNotFound("(db.u.id)".to_string())));
}

#[test]
fn canonical_row_rejects_misaligned_and_duplicate_columns() {
    let key = CanonicalColumnKey::new("db", "t", "id");
    let misaligned = CanonicalRow::new(vec![key.clone()], Vec::new());
    assert_eq!(
        misaligned,
        Err(RowError::LengthMismatch {
            columns: 1,
            values: 0,
        })
    );
    let duplicate = CanonicalRow::new(
        vec![key.clone(), key],
        vec![TypedScalar::Integer(1), TypedScalar::Integer(2)],
    );
    assert!(matches!(duplicate, Err(RowError::DuplicateColumn(_))));
}

proptest! {
    #[test]
    fn canonical_key_is_deterministic(
        database in identifier_strategy(),
        table in identifier_strategy(),
        column in identifier_strategy(),
    ) {
        let first = CanonicalColumnKey::new(&database, &table, &column);
        let second = CanonicalColumnKey::new(&database, &table, &column);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.as_str(), format!("({database}.{table}.{column})"));
    }

    #[test]
    fn distinct_columns_produce_distinct_keys(
        database in identifier_strategy(),
        table in identifier_strategy(),
        left in identifier_strategy(),
        right in identifier_strategy(),
    ) {
        prop_assume!(left != right);
        let left_key = CanonicalColumnKey::new(&database, &table, &left);
        let right_key = CanonicalColumnKey::new(&database, &table, &right);
        prop_assert_ne!(left_key, right_key);
    }

    #[test]
    fn type_mapping_never_panics(type_name in ".*") {
        let kind = ScalarKind::from_type_name(&type_name);
        prop_assert!(!kind.as_str().is_empty());
    }

    #[test]
    fn sized_varchar_decodes_as_string(size in 0_u32 .. 65_536) {
        let varchar = format!("VARCHAR[{size}]");
        let blob = format!("BLOB[{size}]");
        prop_assert_eq!(ScalarKind::from_type_name(&varchar), ScalarKind::String);
        prop_assert_eq!(ScalarKind::from_type_name(&blob), ScalarKind::Bytes);
    }
}
