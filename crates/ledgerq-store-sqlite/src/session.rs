// crates/ledgerq-store-sqlite/src/session.rs
// ============================================================================
// Module: Ledger Session
// Description: Query session with optional post-query verification.
// Purpose: Bind statements, the SQLite ledger store, and the verification hook.
// Dependencies: ledgerq-core, thiserror
// ============================================================================

//! ## Overview
//! A [`LedgerSession`] is the entry point callers use. It migrates table
//! schemas, executes writes, and runs queries. When verification is enabled
//! every query result is proven against the ledger before it is returned;
//! time-travel queries are refused in that mode.
//!
//! The ledger client is resolved once, when the session is built. Schema
//! operations the ledger cannot express are reported as capability gaps.
//! Statements run through the store's own dialect; [`LedgerSession::ledger_sql`]
//! renders them in the ledger's native form with the configured time-travel
//! style.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use ledgerq_core::AdapterError;
use ledgerq_core::AuditSink;
use ledgerq_core::CanonicalRow;
use ledgerq_core::CompiledStatement;
use ledgerq_core::InsertStatement;
use ledgerq_core::LedgerClient;
use ledgerq_core::LedgerDialect;
use ledgerq_core::LedgerError;
use ledgerq_core::MaterializeError;
use ledgerq_core::OperationErrors;
use ledgerq_core::QueryContext;
use ledgerq_core::SelectStatement;
use ledgerq_core::SessionConfig;
use ledgerq_core::StatementError;
use ledgerq_core::TableSchema;
use ledgerq_core::UpdateStatement;
use ledgerq_core::UpsertClause;
use ledgerq_core::VerificationError;
use ledgerq_core::VerificationHook;
use ledgerq_core::materialize_rows;
use thiserror::Error;

use crate::store::SqliteLedgerError;
use crate::store::SqliteLedgerStore;
use crate::store::WriteOutcome;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Store failure.
    #[error(transparent)]
    Store(#[from] SqliteLedgerError),
    /// Statement could not be rendered.
    #[error(transparent)]
    Statement(#[from] StatementError),
    /// Query result failed verification.
    #[error(transparent)]
    Verification(#[from] VerificationError),
    /// Query result could not be materialized.
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    /// Ledger lookup failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Operation is outside what the ledger supports.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Query session over a [`SqliteLedgerStore`].
///
/// # Invariants
/// - The session database equals the store database.
#[derive(Clone)]
pub struct LedgerSession {
    /// Backing store.
    store: SqliteLedgerStore,
    /// Session settings.
    config: SessionConfig,
    /// Ledger client used for schema introspection.
    client: Option<Arc<dyn LedgerClient>>,
    /// Post-query verification hook.
    hook: VerificationHook,
    /// Native ledger dialect for [`LedgerSession::ledger_sql`].
    ledger_dialect: LedgerDialect,
}

impl std::fmt::Debug for LedgerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerSession")
            .field("config", &self.config)
            .field("has_client", &self.client.is_some())
            .field("hook", &self.hook)
            .field("ledger_dialect", &self.ledger_dialect)
            .finish_non_exhaustive()
    }
}

impl LedgerSession {
    /// Opens a session that uses `store` as its ledger client.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError::Invalid`] when `config` names another
    /// database than the store.
    pub fn new(store: SqliteLedgerStore, config: SessionConfig) -> Result<Self, SessionError> {
        if config.database != store.database() {
            return Err(SqliteLedgerError::Invalid(format!(
                "session database {} does not match store database {}",
                config.database,
                store.database()
            ))
            .into());
        }
        let client: Arc<dyn LedgerClient> = Arc::new(store.clone());
        let hook = VerificationHook::new(config.database.clone(), Some(Arc::clone(&client)));
        Ok(Self {
            store,
            config,
            client: Some(client),
            hook,
            ledger_dialect: LedgerDialect::default(),
        })
    }

    /// Replaces the ledger client; `None` leaves the session without one.
    #[must_use]
    pub fn with_ledger_client(mut self, client: Option<Arc<dyn LedgerClient>>) -> Self {
        self.hook = VerificationHook::new(self.config.database.clone(), client.clone());
        self.client = client;
        self
    }

    /// Routes verification outcomes to `audit`.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.hook = self.hook.with_audit_sink(audit);
        self
    }

    /// Sets the native ledger dialect used by [`LedgerSession::ledger_sql`].
    #[must_use]
    pub const fn with_ledger_dialect(mut self, dialect: LedgerDialect) -> Self {
        self.ledger_dialect = dialect;
        self
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &SqliteLedgerStore {
        &self.store
    }

    /// Returns the session settings.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the configured database name.
    #[must_use]
    pub fn current_database(&self) -> &str {
        &self.config.database
    }

    /// Returns the native ledger dialect.
    #[must_use]
    pub const fn ledger_dialect(&self) -> LedgerDialect {
        self.ledger_dialect
    }

    /// Returns the resolved ledger client.
    fn client(&self) -> Result<&Arc<dyn LedgerClient>, SessionError> {
        self.client
            .as_ref()
            .ok_or(SessionError::Verification(VerificationError::MissingLedgerClient))
    }

    // ------------------------------------------------------------------------
    // Migration
    // ------------------------------------------------------------------------

    /// Creates `schema` and its indexes when missing.
    ///
    /// An existing table only gains missing indexes; columns the ledger
    /// does not already have cannot be added.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::NotImplemented`] when the schema adds columns
    /// to an existing table, and store errors otherwise.
    pub fn auto_migrate(&self, schema: &TableSchema) -> Result<(), SessionError> {
        if self.has_table(&schema.name)? {
            for field in &schema.fields {
                if !self.has_column(&schema.name, &field.name)? {
                    return Err(AdapterError::NotImplemented.into());
                }
            }
        } else {
            self.store.create_table(schema)?;
        }
        let existing = self
            .store
            .table_schema(&schema.name)?
            .map(|stored| stored.indexes)
            .unwrap_or_default();
        for index in &schema.indexes {
            if !existing.iter().any(|present| present.name == index.name) {
                self.store.create_index(&schema.name, index)?;
            }
        }
        Ok(())
    }

    /// Returns true when the ledger knows `table`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for failures other than a missing table.
    pub fn has_table(&self, table: &str) -> Result<bool, SessionError> {
        match self.client()?.describe_table(&self.config.database, table) {
            Ok(_) => Ok(true),
            Err(LedgerError::TableNotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns true when `table` has `column`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for failures other than a missing table.
    pub fn has_column(&self, table: &str, column: &str) -> Result<bool, SessionError> {
        match self.client()?.describe_table(&self.config.database, table) {
            Ok(description) => Ok(description.column(column).is_some()),
            Err(LedgerError::TableNotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns true when `table` declares an index named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the catalog cannot be read.
    pub fn has_index(&self, table: &str, name: &str) -> Result<bool, SessionError> {
        Ok(self
            .store
            .table_schema(table)?
            .is_some_and(|schema| schema.indexes.iter().any(|index| index.name == name)))
    }

    /// Returns `(column, type name)` pairs of `table` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TableNotFound`] when the table is unknown.
    pub fn column_types(&self, table: &str) -> Result<Vec<(String, String)>, SessionError> {
        let description = self.client()?.describe_table(&self.config.database, table)?;
        Ok(description
            .columns
            .into_iter()
            .map(|column| (column.name, column.type_name))
            .collect())
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Inserts one row.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the write fails.
    pub fn insert(&self, statement: &InsertStatement) -> Result<WriteOutcome, SessionError> {
        Ok(self.store.insert(statement)?)
    }

    /// Inserts or replaces one row.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the write fails.
    pub fn upsert(&self, statement: &InsertStatement) -> Result<WriteOutcome, SessionError> {
        let statement = statement.clone().upsert(UpsertClause::default());
        Ok(self.store.insert(&statement)?)
    }

    /// Updates the rows matching the statement conditions.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the write fails.
    pub fn update(&self, statement: &UpdateStatement) -> Result<WriteOutcome, SessionError> {
        Ok(self.store.update(statement)?)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Runs a query and returns its canonical rows.
    ///
    /// # Errors
    ///
    /// Returns the first verification error when verification is enabled,
    /// and statement or store errors otherwise.
    pub fn query(&self, statement: &SelectStatement) -> Result<Vec<CanonicalRow>, SessionError> {
        let dialect = self.store.dialect()?;
        let compiled = statement.compile(&dialect)?;
        let result = self.store.query(&compiled)?;
        if self.config.verify {
            let schema = self
                .store
                .table_schema(statement.table())?
                .ok_or_else(|| LedgerError::TableNotFound(statement.table().to_string()))?;
            let context = QueryContext {
                table: statement.table(),
                primary_key: &schema.primary_key,
                time_travel: compiled.time_travel,
            };
            let mut errors = OperationErrors::new();
            self.hook.after_query(&context, &mut result.cursor(), &mut errors);
            errors.into_result()?;
        }
        Ok(materialize_rows(&mut result.cursor(), &self.config.database, statement.table())?)
    }

    /// Renders `statement` in the ledger's native SQL.
    ///
    /// Time travel is written with the session's configured style, for
    /// example `t BEFORE TX 9` or `(t BEFORE TX 9)`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Statement`] when the statement is malformed.
    pub fn ledger_sql(
        &self,
        statement: &SelectStatement,
    ) -> Result<CompiledStatement, SessionError> {
        Ok(statement.compile(&self.ledger_dialect)?)
    }

    /// Returns the row with the lowest primary key.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the query fails.
    pub fn first(&self, statement: SelectStatement) -> Result<Option<CanonicalRow>, SessionError> {
        self.single_by_key(statement, false)
    }

    /// Returns the row with the highest primary key.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the query fails.
    pub fn last(&self, statement: SelectStatement) -> Result<Option<CanonicalRow>, SessionError> {
        self.single_by_key(statement, true)
    }

    /// Orders by primary key and returns at most one row.
    fn single_by_key(
        &self,
        statement: SelectStatement,
        descending: bool,
    ) -> Result<Option<CanonicalRow>, SessionError> {
        let schema = self
            .store
            .table_schema(statement.table())?
            .ok_or_else(|| LedgerError::TableNotFound(statement.table().to_string()))?;
        let statement = statement.order_by(schema.primary_key, descending).limit(1);
        Ok(self.query(&statement)?.into_iter().next())
    }

    // ------------------------------------------------------------------------
    // Capability Gaps
    // ------------------------------------------------------------------------

    /// Deletes rows; the ledger keeps every version, so this is refused.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::DeleteNotImplemented`].
    pub fn delete(&self, _table: &str) -> Result<WriteOutcome, SessionError> {
        Err(AdapterError::DeleteNotImplemented.into())
    }

    /// Creates a savepoint.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::NotImplemented`].
    pub fn savepoint(&self, _name: &str) -> Result<(), SessionError> {
        Err(AdapterError::NotImplemented.into())
    }

    /// Rolls back to a savepoint.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::NotImplemented`].
    pub fn rollback_to(&self, _name: &str) -> Result<(), SessionError> {
        Err(AdapterError::NotImplemented.into())
    }

    /// Drops a table.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::NotImplemented`].
    pub fn drop_table(&self, _table: &str) -> Result<(), SessionError> {
        Err(AdapterError::NotImplemented.into())
    }

    /// Alters a column.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::NotImplemented`].
    pub fn alter_column(&self, _table: &str, _column: &str) -> Result<(), SessionError> {
        Err(AdapterError::NotImplemented.into())
    }

    /// Drops a column.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::NotImplemented`].
    pub fn drop_column(&self, _table: &str, _column: &str) -> Result<(), SessionError> {
        Err(AdapterError::NotImplemented.into())
    }

    /// Renames an index.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::NotImplemented`].
    pub fn rename_index(&self, _table: &str, _from: &str, _to: &str) -> Result<(), SessionError> {
        Err(AdapterError::NotImplemented.into())
    }

    /// Drops an index.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::NotImplemented`].
    pub fn drop_index(&self, _table: &str, _index: &str) -> Result<(), SessionError> {
        Err(AdapterError::NotImplemented.into())
    }

    /// Creates a constraint.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::ConstraintsNotImplemented`].
    pub fn create_constraint(&self, _table: &str, _name: &str) -> Result<(), SessionError> {
        Err(AdapterError::ConstraintsNotImplemented.into())
    }

    /// Drops a constraint.
    ///
    /// # Errors
    ///
    /// Always returns [`AdapterError::ConstraintsNotImplemented`].
    pub fn drop_constraint(&self, _table: &str, _name: &str) -> Result<(), SessionError> {
        Err(AdapterError::ConstraintsNotImplemented.into())
    }

    /// Reports constraints; the ledger has none.
    #[must_use]
    pub const fn has_constraint(&self, _table: &str, _name: &str) -> bool {
        false
    }
}
