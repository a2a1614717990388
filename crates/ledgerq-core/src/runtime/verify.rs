// crates/ledgerq-core/src/runtime/verify.rs
// ============================================================================
// Module: Verification Orchestrator
// Description: Post-query hook that proves result rows against the ledger.
// Purpose: Turn "the query returned rows" into "the ledger vouches for them".
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! [`VerificationHook`] runs after a query when verification is enabled. It
//! rejects time-travel queries before reading anything, materializes every
//! result row, extracts each row's primary key, and asks the ledger client to
//! verify the row. Integrity failures are normalized to
//! [`VerificationError::CorruptedData`]; every other ledger error is passed
//! through unchanged.
//!
//! The hook is synchronous and holds no state between queries. Errors are
//! either returned ([`VerificationHook::verify`]) or attached to the calling
//! operation's [`OperationErrors`] ([`VerificationHook::after_query`]).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::column::CanonicalColumnKey;
use crate::core::time_travel::TimeTravel;
use crate::interfaces::LedgerClient;
use crate::interfaces::LedgerError;
use crate::interfaces::ResultCursor;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::LedgerAuditEvent;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::materializer::MaterializeError;
use crate::runtime::materializer::materialize_rows;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Verification failures.
///
/// # Invariants
/// - Variants and [`VerificationError::kind`] labels are stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Result column metadata was unusable.
    #[error("column introspection failed: {0}")]
    ColumnIntrospection(String),
    /// A result row could not be read.
    #[error("row scan failed: {0}")]
    Scan(String),
    /// A result row has no primary-key column.
    #[error("primary key not found: {0}")]
    PrimaryKeyNotFound(String),
    /// The ledger reported an integrity failure.
    #[error("corrupted data")]
    CorruptedData,
    /// Time-travel queries cannot be verified.
    #[error("time travel is not available if verify flag is provided")]
    TimeTravelUnavailable,
    /// The session has no ledger client.
    #[error("ledger client unavailable")]
    MissingLedgerClient,
    /// Any other ledger error, unchanged.
    #[error(transparent)]
    Ledger(LedgerError),
}

impl VerificationError {
    /// Returns a stable label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ColumnIntrospection(_) => "column_introspection",
            Self::Scan(_) => "scan",
            Self::PrimaryKeyNotFound(_) => "primary_key_not_found",
            Self::CorruptedData => "corrupted_data",
            Self::TimeTravelUnavailable => "time_travel_unavailable",
            Self::MissingLedgerClient => "missing_ledger_client",
            Self::Ledger(_) => "ledger",
        }
    }
}

impl From<MaterializeError> for VerificationError {
    fn from(error: MaterializeError) -> Self {
        match error {
            MaterializeError::ColumnIntrospection(message) => Self::ColumnIntrospection(message),
            MaterializeError::Scan(message) => Self::Scan(message),
        }
    }
}

/// Normalizes a ledger error: integrity failures become
/// [`VerificationError::CorruptedData`], everything else passes through.
#[must_use]
pub fn map_ledger_error(error: LedgerError) -> VerificationError {
    if error.is_data_corrupted() {
        VerificationError::CorruptedData
    } else {
        VerificationError::Ledger(error)
    }
}

// ============================================================================
// SECTION: Operation Errors
// ============================================================================

/// Errors attached to one query operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationErrors {
    /// Errors in the order they were attached.
    errors: Vec<VerificationError>,
}

impl OperationErrors {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            errors: Vec::new(),
        }
    }

    /// Attaches an error.
    pub fn push(&mut self, error: VerificationError) {
        self.errors.push(error);
    }

    /// Returns true when no error was attached.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the attached errors.
    #[must_use]
    pub fn errors(&self) -> &[VerificationError] {
        &self.errors
    }

    /// Returns the first attached error.
    #[must_use]
    pub fn first(&self) -> Option<&VerificationError> {
        self.errors.first()
    }

    /// Converts into `Err(first error)` or `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns the first attached error.
    pub fn into_result(self) -> Result<(), VerificationError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Query Context
// ============================================================================

/// Query facts the hook needs beyond the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryContext<'a> {
    /// Queried table.
    pub table: &'a str,
    /// Primary-key column of the table.
    pub primary_key: &'a str,
    /// Time-travel qualifier carried by the statement.
    pub time_travel: Option<TimeTravel>,
}

// ============================================================================
// SECTION: Hook
// ============================================================================

/// Post-query verification hook.
///
/// # Invariants
/// - The ledger client is resolved once, when the hook is built.
#[derive(Clone)]
pub struct VerificationHook {
    /// Database name for canonical keys and ledger calls.
    database: String,
    /// Ledger client, when the session resolved one.
    client: Option<Arc<dyn LedgerClient>>,
    /// Audit sink for outcomes.
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for VerificationHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationHook")
            .field("database", &self.database)
            .field("has_client", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl VerificationHook {
    /// Builds a hook for `database`.
    #[must_use]
    pub fn new(database: impl Into<String>, client: Option<Arc<dyn LedgerClient>>) -> Self {
        Self {
            database: database.into(),
            client,
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the database name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Verifies every row of `cursor`, returning the number of rows verified.
    ///
    /// A time-travel query fails before the cursor is read and before any
    /// ledger call. An empty result verifies trivially.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] for the first failure; remaining rows are
    /// not checked.
    pub fn verify<C: ResultCursor + ?Sized>(
        &self,
        context: &QueryContext<'_>,
        cursor: &mut C,
    ) -> Result<usize, VerificationError> {
        if let Some(time_travel) = context.time_travel {
            self.audit.record(&LedgerAuditEvent::time_travel_rejected(
                &self.database,
                context.table,
                time_travel,
            ));
            return Err(VerificationError::TimeTravelUnavailable);
        }
        let outcome = self.verify_rows(context, cursor);
        match &outcome {
            Ok(rows) => self.audit.record(&LedgerAuditEvent::verification_passed(
                &self.database,
                context.table,
                *rows,
            )),
            Err(error) => self.audit.record(&LedgerAuditEvent::verification_failed(
                &self.database,
                context.table,
                error.kind(),
                error.to_string(),
            )),
        }
        outcome
    }

    /// Runs [`VerificationHook::verify`] and attaches any error to `errors`.
    pub fn after_query<C: ResultCursor + ?Sized>(
        &self,
        context: &QueryContext<'_>,
        cursor: &mut C,
        errors: &mut OperationErrors,
    ) {
        if let Err(error) = self.verify(context, cursor) {
            errors.push(error);
        }
    }

    /// Materializes and verifies each row.
    fn verify_rows<C: ResultCursor + ?Sized>(
        &self,
        context: &QueryContext<'_>,
        cursor: &mut C,
    ) -> Result<usize, VerificationError> {
        let client = self.client.as_ref().ok_or(VerificationError::MissingLedgerClient)?;
        let rows = materialize_rows(cursor, &self.database, context.table)?;
        let key = CanonicalColumnKey::new(&self.database, context.table, context.primary_key);
        for row in &rows {
            let primary_key = row
                .primary_key(&key)
                .map_err(|_| VerificationError::PrimaryKeyNotFound(key.to_string()))?;
            client
                .verify_row(&self.database, row, context.table, &primary_key)
                .map_err(map_ledger_error)?;
        }
        Ok(rows.len())
    }
}
