// crates/ledgerq-core/src/runtime/audit.rs
// ============================================================================
// Module: Ledger Audit Logging
// Description: Structured audit events for verification and ledger commits.
// Purpose: Emit JSON-line audit records without a logging framework dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Verification outcomes and ledger commits are reported as
//! [`LedgerAuditEvent`] records through an [`AuditSink`]. Sinks are
//! best-effort: a failed write never changes the outcome of the operation
//! being audited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::time_travel::TimeTravel;

// ============================================================================
// SECTION: Event Names
// ============================================================================

/// Rows of a query were verified against the ledger.
pub const EVENT_VERIFICATION_PASSED: &str = "verification_passed";
/// Verification of a query result failed.
pub const EVENT_VERIFICATION_FAILED: &str = "verification_failed";
/// A verified query carried a time-travel qualifier.
pub const EVENT_TIME_TRAVEL_REJECTED: &str = "time_travel_rejected";
/// The ledger committed a transaction.
pub const EVENT_TX_COMMITTED: &str = "tx_committed";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Database name.
    pub database: String,
    /// Table name when the event concerns one table.
    pub table: Option<String>,
    /// Transaction identifier when known.
    pub tx_id: Option<u64>,
    /// Number of rows involved.
    pub rows: Option<usize>,
    /// Outcome label: `ok` or `error`.
    pub outcome: &'static str,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Free-form detail.
    pub message: Option<String>,
}

impl LedgerAuditEvent {
    /// Creates an event with a consistent timestamp and no optional fields.
    #[must_use]
    fn base(event: &'static str, database: &str, outcome: &'static str) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            database: database.to_string(),
            table: None,
            tx_id: None,
            rows: None,
            outcome,
            error_kind: None,
            message: None,
        }
    }

    /// Records that `rows` rows of `table` verified.
    #[must_use]
    pub fn verification_passed(database: &str, table: &str, rows: usize) -> Self {
        let mut event = Self::base(EVENT_VERIFICATION_PASSED, database, "ok");
        event.table = Some(table.to_string());
        event.rows = Some(rows);
        event
    }

    /// Records a verification failure.
    #[must_use]
    pub fn verification_failed(
        database: &str,
        table: &str,
        error_kind: &'static str,
        message: String,
    ) -> Self {
        let mut event = Self::base(EVENT_VERIFICATION_FAILED, database, "error");
        event.table = Some(table.to_string());
        event.error_kind = Some(error_kind);
        event.message = Some(message);
        event
    }

    /// Records a verified query rejected for carrying a time-travel qualifier.
    #[must_use]
    pub fn time_travel_rejected(database: &str, table: &str, time_travel: TimeTravel) -> Self {
        let mut event = Self::base(EVENT_TIME_TRAVEL_REJECTED, database, "error");
        event.table = Some(table.to_string());
        event.tx_id = Some(time_travel.tx_id());
        event.error_kind = Some("time_travel_unavailable");
        event.message = Some(time_travel.to_string());
        event
    }

    /// Records a committed ledger transaction.
    #[must_use]
    pub fn tx_committed(database: &str, tx_id: u64, kind: &str, rows: usize) -> Self {
        let mut event = Self::base(EVENT_TX_COMMITTED, database, "ok");
        event.tx_id = Some(tx_id);
        event.rows = Some(rows);
        event.message = Some(kind.to_string());
        event
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for ledger events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &LedgerAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &LedgerAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &LedgerAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &LedgerAuditEvent) {}
}
