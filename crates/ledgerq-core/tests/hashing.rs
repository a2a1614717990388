// crates/ledgerq-core/tests/hashing.rs
// ============================================================================
// Module: Canonical Hashing Tests
// Description: Verifies row snapshot and transaction chain hashing.
// ============================================================================
//! ## Overview
//! Ensures row and chain digests are deterministic, independent of column
//! insertion order, and sensitive to every hashed field.

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

use std::collections::BTreeMap;

use ledgerq_core::ChainLink;
use ledgerq_core::HashAlgorithm;
use ledgerq_core::RowSnapshot;
use ledgerq_core::TypedScalar;
use ledgerq_core::hashing::canonical_json_bytes;
use ledgerq_core::hashing::hash_bytes;
use ledgerq_core::hashing::hash_chain_link;
use ledgerq_core::hashing::hash_row_snapshot;

fn columns(pairs: &[(&str, TypedScalar)]) -> BTreeMap<String, TypedScalar> {
    pairs.iter().map(|(name, value)| ((*name).to_string(), value.clone())).collect()
}

#[test]
fn sha256_digest_is_lowercase_hex() {
    let digest = hash_bytes(HashAlgorithm::Sha256, b"abc");
    assert_eq!(
        digest.value,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(digest.algorithm, HashAlgorithm::Sha256);
}

#[test]
fn row_snapshot_hash_ignores_column_insertion_order() {
    let key = TypedScalar::Integer(1);
    let forward = columns(&[("id", key.clone()), ("name", TypedScalar::from("ada"))]);
    let reverse = columns(&[("name", TypedScalar::from("ada")), ("id", key.clone())]);
    let left = RowSnapshot {
        table: "entities",
        primary_key: &key,
        columns: &forward,
    };
    let right = RowSnapshot {
        table: "entities",
        primary_key: &key,
        columns: &reverse,
    };
    assert_eq!(
        hash_row_snapshot(HashAlgorithm::Sha256, &left).unwrap(),
        hash_row_snapshot(HashAlgorithm::Sha256, &right).unwrap()
    );
}

#[test]
fn row_snapshot_hash_changes_with_any_value() {
    let key = TypedScalar::Integer(1);
    let original = columns(&[("id", key.clone()), ("i32", TypedScalar::Integer(5))]);
    let tampered = columns(&[("id", key.clone()), ("i32", TypedScalar::Integer(6))]);
    let hash = |values: &BTreeMap<String, TypedScalar>, table: &str| {
        let snapshot = RowSnapshot {
            table,
            primary_key: &key,
            columns: values,
        };
        hash_row_snapshot(HashAlgorithm::Sha256, &snapshot).unwrap()
    };
    assert_ne!(hash(&original, "entities"), hash(&tampered, "entities"));
    assert_ne!(hash(&original, "entities"), hash(&original, "archive"));
}

#[test]
fn typed_scalars_keep_their_kind_in_canonical_json() {
    let integer = canonical_json_bytes(&TypedScalar::Integer(1)).unwrap();
    let text = canonical_json_bytes(&TypedScalar::from("1")).unwrap();
    assert_ne!(integer, text);
    assert_eq!(String::from_utf8(integer).unwrap(), r#"{"kind":"integer","value":1}"#);
    let null = canonical_json_bytes(&TypedScalar::Null).unwrap();
    assert_eq!(String::from_utf8(null).unwrap(), r#"{"kind":"null"}"#);
}

#[test]
fn chain_link_hash_depends_on_previous_hash() {
    let genesis = ChainLink {
        tx_id: 1,
        kind: "genesis",
        payload_hash: "00",
        prev_hash: None,
        committed_at_ms: 1_700_000_000_000,
    };
    let genesis_hash = hash_chain_link(HashAlgorithm::Sha256, &genesis).unwrap();
    assert_eq!(genesis_hash, hash_chain_link(HashAlgorithm::Sha256, &genesis).unwrap());

    let next = ChainLink {
        tx_id: 2,
        kind: "ddl",
        payload_hash: "11",
        prev_hash: Some(genesis_hash.value.as_str()),
        committed_at_ms: 1_700_000_000_001,
    };
    let forged = ChainLink {
        prev_hash: Some("ff"),
        ..next.clone()
    };
    assert_ne!(
        hash_chain_link(HashAlgorithm::Sha256, &next).unwrap(),
        hash_chain_link(HashAlgorithm::Sha256, &forged).unwrap()
    );
}
