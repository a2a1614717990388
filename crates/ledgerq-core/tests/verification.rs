// crates/ledgerq-core/tests/verification.rs
// ============================================================================
// Module: Verification Hook Tests
// Description: Tests for post-query ledger verification.
// Purpose: Pin error normalization, time-travel rejection, and audit output.
// ============================================================================
//! ## Overview
//! Runs the verification hook against a scripted ledger client and checks
//! which rows reach the ledger and how failures surface.

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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use ledgerq_core::AuditSink;
use ledgerq_core::CORRUPTED_DATA_MESSAGE;
use ledgerq_core::CanonicalRow;
use ledgerq_core::CursorError;
use ledgerq_core::LedgerAuditEvent;
use ledgerq_core::LedgerClient;
use ledgerq_core::LedgerError;
use ledgerq_core::OperationErrors;
use ledgerq_core::PrimaryKeyValue;
use ledgerq_core::QueryContext;
use ledgerq_core::ResultCursor;
use ledgerq_core::ScalarKind;
use ledgerq_core::TableDescription;
use ledgerq_core::TypedScalar;
use ledgerq_core::VerificationError;
use ledgerq_core::VerificationHook;
use ledgerq_core::before_tx;
use ledgerq_core::map_ledger_error;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

struct VecCursor {
    columns: Vec<String>,
    rows: Vec<Vec<TypedScalar>>,
    position: Option<usize>,
    advanced: usize,
}

impl VecCursor {
    fn entities(ids: &[i64]) -> Self {
        Self {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: ids
                .iter()
                .map(|id| vec![TypedScalar::Integer(*id), TypedScalar::from(format!("row-{id}"))])
                .collect(),
            position: None,
            advanced: 0,
        }
    }
}

impl ResultCursor for VecCursor {
    fn columns(&self) -> Result<Vec<String>, CursorError> {
        Ok(self.columns.clone())
    }

    fn column_type_names(&self) -> Result<Vec<String>, CursorError> {
        Ok(vec!["INTEGER".to_string(), "VARCHAR".to_string()])
    }

    fn advance(&mut self) -> Result<bool, CursorError> {
        self.advanced += 1;
        let next = self.position.map_or(0, |position| position + 1);
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn scan(&self, index: usize, _kind: ScalarKind) -> Result<Option<TypedScalar>, CursorError> {
        let row = self.position.and_then(|position| self.rows.get(position));
        let row = row.ok_or(CursorError::NotPositioned)?;
        Ok(row.get(index).cloned())
    }
}

/// Ledger client that fails for one primary key with a scripted error.
struct ScriptedLedger {
    calls: AtomicUsize,
    keys: Mutex<Vec<TypedScalar>>,
    fail_on: Option<(i64, LedgerError)>,
}

impl ScriptedLedger {
    fn passing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    fn failing(id: i64, error: LedgerError) -> Self {
        Self {
            fail_on: Some((id, error)),
            ..Self::passing()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LedgerClient for ScriptedLedger {
    fn describe_table(
        &self,
        _database: &str,
        table: &str,
    ) -> Result<TableDescription, LedgerError> {
        Err(LedgerError::TableNotFound(table.to_string()))
    }

    fn verify_row(
        &self,
        database: &str,
        row: &CanonicalRow,
        table: &str,
        primary_key: &PrimaryKeyValue,
    ) -> Result<(), LedgerError> {
        assert_eq!(database, "ledgerdb");
        assert_eq!(table, "entities");
        assert_eq!(row.len(), 2);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().unwrap().push(primary_key.value().clone());
        match &self.fail_on {
            Some((id, error)) if primary_key.value() == &TypedScalar::Integer(*id) => {
                Err(error.clone())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<LedgerAuditEvent>>,
}

impl RecordingSink {
    fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|event| event.event).collect()
    }
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &LedgerAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

const CONTEXT: QueryContext<'static> = QueryContext {
    table: "entities",
    primary_key: "id",
    time_travel: None,
};

fn hook_with(ledger: &Arc<ScriptedLedger>, sink: &Arc<RecordingSink>) -> VerificationHook {
    let client: Arc<dyn LedgerClient> = ledger.clone();
    VerificationHook::new("ledgerdb", Some(client)).with_audit_sink(sink.clone())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn verifies_every_row_in_order() {
    let ledger = Arc::new(ScriptedLedger::passing());
    let sink = Arc::new(RecordingSink::default());
    let hook = hook_with(&ledger, &sink);
    let mut cursor = VecCursor::entities(&[1, 2, 3]);
    let verified = hook.verify(&CONTEXT, &mut cursor).unwrap();
    assert_eq!(verified, 3);
    assert_eq!(
        *ledger.keys.lock().unwrap(),
        vec![TypedScalar::Integer(1), TypedScalar::Integer(2), TypedScalar::Integer(3)]
    );
    assert_eq!(sink.event_names(), vec!["verification_passed"]);
    assert_eq!(sink.events.lock().unwrap()[0].rows, Some(3));
}

#[test]
fn empty_result_verifies_trivially() {
    let ledger = Arc::new(ScriptedLedger::passing());
    let sink = Arc::new(RecordingSink::default());
    let hook = hook_with(&ledger, &sink);
    let mut cursor = VecCursor::entities(&[]);
    assert_eq!(hook.verify(&CONTEXT, &mut cursor), Ok(0));
    assert_eq!(ledger.calls(), 0);
    assert_eq!(sink.event_names(), vec!["verification_passed"]);
}

#[test]
fn time_travel_is_rejected_before_any_ledger_call() {
    let ledger = Arc::new(ScriptedLedger::passing());
    let sink = Arc::new(RecordingSink::default());
    let hook = hook_with(&ledger, &sink);
    let mut cursor = VecCursor::entities(&[1, 2]);
    let context = QueryContext {
        time_travel: Some(before_tx(9)),
        ..CONTEXT
    };
    let result = hook.verify(&context, &mut cursor);
    assert_eq!(result, Err(VerificationError::TimeTravelUnavailable));
    assert_eq!(ledger.calls(), 0);
    assert_eq!(cursor.advanced, 0);
    assert_eq!(sink.event_names(), vec!["time_travel_rejected"]);
    let event = sink.events.lock().unwrap()[0].clone();
    assert_eq!(event.tx_id, Some(9));
    assert_eq!(event.message.as_deref(), Some("BEFORE TX 9"));
}

#[test]
fn corrupted_row_stops_verification() {
    let ledger = Arc::new(ScriptedLedger::failing(2, LedgerError::DataCorrupted));
    let sink = Arc::new(RecordingSink::default());
    let hook = hook_with(&ledger, &sink);
    let mut cursor = VecCursor::entities(&[1, 2, 3]);
    let result = hook.verify(&CONTEXT, &mut cursor);
    assert_eq!(result, Err(VerificationError::CorruptedData));
    assert_eq!(ledger.calls(), 2);
    assert_eq!(sink.event_names(), vec!["verification_failed"]);
    assert_eq!(sink.events.lock().unwrap()[0].error_kind, Some("corrupted_data"));
}

#[test]
fn corrupted_message_from_remote_is_normalized() {
    let error = LedgerError::Remote(CORRUPTED_DATA_MESSAGE.to_string());
    let ledger = Arc::new(ScriptedLedger::failing(1, error));
    let hook = hook_with(&ledger, &Arc::new(RecordingSink::default()));
    let mut cursor = VecCursor::entities(&[1]);
    assert_eq!(hook.verify(&CONTEXT, &mut cursor), Err(VerificationError::CorruptedData));
}

#[test]
fn other_ledger_errors_pass_through_unchanged() {
    let error = LedgerError::Io("connection reset".to_string());
    let ledger = Arc::new(ScriptedLedger::failing(1, error.clone()));
    let hook = hook_with(&ledger, &Arc::new(RecordingSink::default()));
    let mut cursor = VecCursor::entities(&[1]);
    assert_eq!(hook.verify(&CONTEXT, &mut cursor), Err(VerificationError::Ledger(error)));
}

#[test]
fn ledger_error_mapping_is_stable() {
    assert_eq!(map_ledger_error(LedgerError::DataCorrupted), VerificationError::CorruptedData);
    assert_eq!(
        map_ledger_error(LedgerError::Remote("timeout".to_string())),
        VerificationError::Ledger(LedgerError::Remote("timeout".to_string()))
    );
    assert_eq!(
        map_ledger_error(LedgerError::RowNotFound("7".to_string())),
        VerificationError::Ledger(LedgerError::RowNotFound("7".to_string()))
    );
}

#[test]
fn missing_client_fails_verification() {
    let hook = VerificationHook::new("ledgerdb", None);
    let mut cursor = VecCursor::entities(&[1]);
    assert_eq!(hook.verify(&CONTEXT, &mut cursor), Err(VerificationError::MissingLedgerClient));
}

#[test]
fn missing_primary_key_column_fails_verification() {
    let ledger = Arc::new(ScriptedLedger::passing());
    let hook = hook_with(&ledger, &Arc::new(RecordingSink::default()));
    let mut cursor = VecCursor::entities(&[1]);
    let context = QueryContext {
        primary_key: "uuid",
        ..CONTEXT
    };
    let result = hook.verify(&context, &mut cursor);
    assert_eq!(
        result,
        Err(VerificationError::PrimaryKeyNotFound("(ledgerdb.entities.uuid)".to_string()))
    );
    assert_eq!(ledger.calls(), 0);
}

#[test]
fn after_query_attaches_errors_to_the_operation() {
    let ledger = Arc::new(ScriptedLedger::failing(1, LedgerError::DataCorrupted));
    let hook = hook_with(&ledger, &Arc::new(RecordingSink::default()));
    let mut errors = OperationErrors::new();
    hook.after_query(&CONTEXT, &mut VecCursor::entities(&[1]), &mut errors);
    assert_eq!(errors.errors(), [VerificationError::CorruptedData]);
    assert_eq!(errors.into_result(), Err(VerificationError::CorruptedData));

    let passing = Arc::new(ScriptedLedger::passing());
    let hook = hook_with(&passing, &Arc::new(RecordingSink::default()));
    let mut errors = OperationErrors::new();
    hook.after_query(&CONTEXT, &mut VecCursor::entities(&[1, 2]), &mut errors);
    assert!(errors.is_empty());
    assert_eq!(errors.into_result(), Ok(()));
}
