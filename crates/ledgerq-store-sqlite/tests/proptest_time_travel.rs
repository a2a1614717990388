// crates/ledgerq-store-sqlite/tests/proptest_time_travel.rs
// ============================================================================
// Module: Time-Travel Property-Based Tests
// Description: Property tests for snapshot reads over random write histories.
// Purpose: Check BEFORE/AFTER boundaries against an in-memory model.
// ============================================================================

//! Property-based tests for time-travel reads against the `SQLite` ledger.

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
use ledgerq_core::DEFAULT_DATABASE;
use ledgerq_core::FieldSchema;
use ledgerq_core::FieldType;
use ledgerq_core::InsertStatement;
use ledgerq_core::SelectStatement;
use ledgerq_core::SessionConfig;
use ledgerq_core::TableSchema;
use ledgerq_core::TypedScalar;
use ledgerq_core::UpdateStatement;
use ledgerq_core::after_tx;
use ledgerq_core::before_tx;
use ledgerq_core::eq;
use ledgerq_store_sqlite::LedgerSession;
use ledgerq_store_sqlite::SqliteLedgerConfig;
use ledgerq_store_sqlite::SqliteLedgerStore;
use proptest::prelude::*;
use tempfile::TempDir;

/// Transaction that inserts the counter row; genesis and DDL come first.
const INSERT_TX: u64 = 3;

fn counter_session(temp: &TempDir) -> LedgerSession {
    let config = SqliteLedgerConfig::new(temp.path().join("ledger.sqlite"));
    let store = SqliteLedgerStore::open(config, DEFAULT_DATABASE).unwrap();
    let session = LedgerSession::new(store, SessionConfig::default()).unwrap();
    let schema = TableSchema::new("counters", "id")
        .field(FieldSchema::new("id", FieldType::Int))
        .field(FieldSchema::new("total", FieldType::Int));
    session.auto_migrate(&schema).unwrap();
    session
}

fn total(session: &LedgerSession, statement: SelectStatement) -> Option<i64> {
    let key = CanonicalColumnKey::new(DEFAULT_DATABASE, "counters", "total");
    session
        .first(statement)
        .unwrap()
        .map(|row| row.get(&key).and_then(TypedScalar::as_i64).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn snapshots_match_write_history(updates in prop::collection::vec(any::<i64>(), 1 .. 8)) {
        let temp = TempDir::new().unwrap();
        let session = counter_session(&temp);
        let inserted = session
            .insert(&InsertStatement::new("counters").value("id", 1_i64).value("total", 0_i64))
            .unwrap();
        prop_assert_eq!(inserted.tx_id, Some(INSERT_TX));

        // history[k] is the value committed by transaction INSERT_TX + k.
        let mut history = vec![0_i64];
        for value in &updates {
            let update =
                UpdateStatement::new("counters").set("total", *value).filter(eq("id", 1_i64));
            session.update(&update).unwrap();
            history.push(*value);
        }

        let before_insert = SelectStatement::new("counters").time_travel(before_tx(INSERT_TX));
        prop_assert_eq!(total(&session, before_insert), None);
        for (offset, expected) in history.iter().enumerate() {
            let tx_id = INSERT_TX + u64::try_from(offset).unwrap();
            let after = SelectStatement::new("counters").time_travel(after_tx(tx_id));
            prop_assert_eq!(total(&session, after), Some(*expected));
            let before = SelectStatement::new("counters").time_travel(before_tx(tx_id + 1));
            prop_assert_eq!(total(&session, before), Some(*expected));
        }
        prop_assert_eq!(total(&session, SelectStatement::new("counters")), history.last().copied());
    }
}
