// crates/ledgerq-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Transaction-versioned, tamper-evident tables backed by SQLite.
// Purpose: Serve queries, time-travel reads, and row verification.
// Dependencies: ledgerq-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each user table has a live table holding the current rows and a history
//! table holding every committed row version. Every write re-reads the
//! affected rows, hashes their canonical JSON snapshot, appends the versions
//! to history, and commits one hash-chained ledger transaction. A new store
//! commits the genesis transaction, so the first user change is transaction 2.
//!
//! [`SqliteLedgerStore`] implements [`LedgerClient`]: `verify_row` proves a
//! result row against the latest committed version and the transaction log.
//!
//! Security posture: database contents are untrusted; every hash a check
//! relies on is recomputed, and failures are reported as corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use ledgerq_core::AuditSink;
use ledgerq_core::CanonicalColumnKey;
use ledgerq_core::CanonicalRow;
use ledgerq_core::ColumnDescription;
use ledgerq_core::CompiledStatement;
use ledgerq_core::DEFAULT_HASH_ALGORITHM;
use ledgerq_core::Dialect;
use ledgerq_core::IndexSchema;
use ledgerq_core::InsertStatement;
use ledgerq_core::LedgerAuditEvent;
use ledgerq_core::LedgerClient;
use ledgerq_core::LedgerError;
use ledgerq_core::NoopAuditSink;
use ledgerq_core::PrimaryKeyValue;
use ledgerq_core::RowSnapshot;
use ledgerq_core::TableDescription;
use ledgerq_core::TableSchema;
use ledgerq_core::TypedScalar;
use ledgerq_core::UpdateStatement;
use ledgerq_core::create_index_sql;
use ledgerq_core::create_table_sql;
use ledgerq_core::hashing::hash_row_snapshot;
use ledgerq_core::materialize_rows;
use ledgerq_core::schema::validate_identifier;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::Deserialize;
use thiserror::Error;

use crate::cursor::SqlParam;
use crate::cursor::SqliteResultSet;
use crate::cursor::UNDECLARED_TYPE_NAME;
use crate::dialect::HASH_ALGORITHM_COLUMN;
use crate::dialect::HISTORY_SUFFIX;
use crate::dialect::ROW_HASH_COLUMN;
use crate::dialect::SqliteLedgerDialect;
use crate::dialect::TX_ID_COLUMN;
use crate::dialect::history_table;
use crate::ledger;
use crate::ledger::TxEntry;
use crate::ledger::TxKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteLedgerConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteLedgerConfig {
    /// Returns a configuration for `path` with default settings.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` ledger store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqliteLedgerError {
    /// Store I/O error.
    #[error("sqlite ledger io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite ledger db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite ledger corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite ledger version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid request or store data.
    #[error("sqlite ledger invalid data: {0}")]
    Invalid(String),
    /// Table is not in the ledger catalog.
    #[error("sqlite ledger unknown table: {0}")]
    UnknownTable(String),
}

impl From<SqliteLedgerError> for LedgerError {
    fn from(error: SqliteLedgerError) -> Self {
        match error {
            SqliteLedgerError::Io(message)
            | SqliteLedgerError::Db(message)
            | SqliteLedgerError::VersionMismatch(message) => Self::Io(message),
            SqliteLedgerError::Corrupt(_) => Self::DataCorrupted,
            SqliteLedgerError::Invalid(message) => Self::Remote(message),
            SqliteLedgerError::UnknownTable(table) => Self::TableNotFound(table),
        }
    }
}

/// Maps a `SQLite` engine error.
pub(crate) fn db_error(err: rusqlite::Error) -> SqliteLedgerError {
    SqliteLedgerError::Db(err.to_string())
}

// ============================================================================
// SECTION: Write Outcome
// ============================================================================

/// Result of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Committed transaction, absent when no row changed.
    pub tx_id: Option<u64>,
    /// Primary keys of the rows that received a new version.
    pub primary_keys: Vec<TypedScalar>,
}

impl WriteOutcome {
    /// Returns the number of rows that received a new version.
    #[must_use]
    pub const fn rows_affected(&self) -> usize {
        self.primary_keys.len()
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed ledger store.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    /// Store configuration.
    config: SqliteLedgerConfig,
    /// Database name bound to the store.
    database: String,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Audit sink for committed transactions.
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for SqliteLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedgerStore")
            .field("config", &self.config)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl SqliteLedgerStore {
    /// Opens a ledger store bound to `database`, committing genesis on creation.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the database cannot be opened or
    /// initialized, or belongs to another database name.
    pub fn open(config: SqliteLedgerConfig, database: &str) -> Result<Self, SqliteLedgerError> {
        if database.trim().is_empty() {
            return Err(SqliteLedgerError::Invalid("database name is empty".to_string()));
        }
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection, database)?;
        Ok(Self {
            config,
            database: database.to_string(),
            connection: Arc::new(Mutex::new(connection)),
            audit: Arc::new(NoopAuditSink),
        })
    }

    /// Replaces the audit sink used for commit events.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the database name bound to the store.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteLedgerConfig {
        &self.config
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteLedgerError> {
        self.connection.lock().map_err(|_| SqliteLedgerError::Db("mutex poisoned".to_string()))
    }

    /// Records a commit event.
    fn audit_commit(&self, tx_id: u64, kind: TxKind, rows: usize) {
        let event = LedgerAuditEvent::tx_committed(&self.database, tx_id, kind.as_str(), rows);
        self.audit.record(&event);
    }

    // ------------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------------

    /// Returns every table schema in the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the catalog cannot be read.
    pub fn catalog(&self) -> Result<BTreeMap<String, TableSchema>, SqliteLedgerError> {
        let guard = self.lock()?;
        load_catalog(&guard)
    }

    /// Returns the schema of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the catalog cannot be read.
    pub fn table_schema(&self, table: &str) -> Result<Option<TableSchema>, SqliteLedgerError> {
        let guard = self.lock()?;
        load_schema(&guard, table)
    }

    /// Returns a dialect bound to the current catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the catalog cannot be read.
    pub fn dialect(&self) -> Result<SqliteLedgerDialect, SqliteLedgerError> {
        Ok(SqliteLedgerDialect::new(self.catalog()?))
    }

    /// Returns the id of the latest committed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the log cannot be read.
    pub fn current_tx_id(&self) -> Result<u64, SqliteLedgerError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let tx_id = ledger::current_tx_id(&tx)?;
        tx.commit().map_err(db_error)?;
        Ok(tx_id)
    }

    /// Re-hashes the full transaction chain and returns its length.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError::Corrupt`] at the first broken link.
    pub fn verify_chain(&self) -> Result<u64, SqliteLedgerError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let count = ledger::verify_chain(&tx)?;
        tx.commit().map_err(db_error)?;
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // DDL
    // ------------------------------------------------------------------------

    /// Creates a table and its history in one transaction.
    ///
    /// Indexes declared on `schema` are not created here; use
    /// [`SqliteLedgerStore::create_index`] for each.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError::Invalid`] for invalid schemas or existing
    /// tables.
    pub fn create_table(&self, schema: &TableSchema) -> Result<u64, SqliteLedgerError> {
        schema.validate().map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
        if schema.name.ends_with(HISTORY_SUFFIX) {
            return Err(SqliteLedgerError::Invalid(format!(
                "table name {} uses the reserved {HISTORY_SUFFIX} suffix",
                schema.name
            )));
        }
        let dialect = SqliteLedgerDialect::default();
        let base = TableSchema {
            indexes: Vec::new(),
            ..schema.clone()
        };
        let live_sql = create_table_sql(&base, &dialect);
        let tx_id = {
            let mut guard = self.lock()?;
            let tx = guard.transaction().map_err(db_error)?;
            if load_schema(&tx, &base.name)?.is_some() {
                return Err(SqliteLedgerError::Invalid(format!(
                    "table {} already exists",
                    base.name
                )));
            }
            tx.execute_batch(&live_sql).map_err(db_error)?;
            tx.execute_batch(&history_table_sql(&base, &dialect)).map_err(db_error)?;
            let tx_id = ledger::append_tx(
                &tx,
                TxKind::Ddl,
                &[TxEntry::Ddl {
                    table: base.name.clone(),
                    statement: live_sql.clone(),
                }],
            )?;
            save_schema(&tx, &base, Some(tx_id))?;
            tx.commit().map_err(db_error)?;
            drop(guard);
            tx_id
        };
        self.audit_commit(tx_id, TxKind::Ddl, 0);
        Ok(tx_id)
    }

    /// Creates an index on `table` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the table or column is unknown, or
    /// the index already exists.
    pub fn create_index(&self, table: &str, index: &IndexSchema) -> Result<u64, SqliteLedgerError> {
        validate_identifier(&index.name)
            .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
        let dialect = SqliteLedgerDialect::default();
        let sql = create_index_sql(table, index, &dialect);
        let tx_id = {
            let mut guard = self.lock()?;
            let tx = guard.transaction().map_err(db_error)?;
            let mut schema = load_schema(&tx, table)?
                .ok_or_else(|| SqliteLedgerError::UnknownTable(table.to_string()))?;
            if schema.field_named(&index.column).is_none() {
                return Err(SqliteLedgerError::Invalid(format!(
                    "index {} references unknown column {}",
                    index.name, index.column
                )));
            }
            if schema.indexes.iter().any(|existing| existing.name == index.name) {
                return Err(SqliteLedgerError::Invalid(format!(
                    "index {} already exists",
                    index.name
                )));
            }
            tx.execute_batch(&sql).map_err(db_error)?;
            let tx_id = ledger::append_tx(
                &tx,
                TxKind::Ddl,
                &[TxEntry::Ddl {
                    table: table.to_string(),
                    statement: sql.clone(),
                }],
            )?;
            schema.indexes.push(index.clone());
            save_schema(&tx, &schema, None)?;
            tx.commit().map_err(db_error)?;
            drop(guard);
            tx_id
        };
        self.audit_commit(tx_id, TxKind::Ddl, 0);
        Ok(tx_id)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Executes an insert or upsert and commits the new row version.
    ///
    /// A conflicting insert with `ON CONFLICT DO NOTHING` changes nothing and
    /// commits no transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError::Invalid`] when the statement gives no
    /// primary key and the table does not generate one, and other errors
    /// when the table or a column is unknown or the write fails.
    pub fn insert(&self, statement: &InsertStatement) -> Result<WriteOutcome, SqliteLedgerError> {
        let outcome = {
            let mut guard = self.lock()?;
            let tx = guard.transaction().map_err(db_error)?;
            let catalog = load_catalog(&tx)?;
            let table = statement.target_table();
            let schema = catalog
                .get(table)
                .cloned()
                .ok_or_else(|| SqliteLedgerError::UnknownTable(table.to_string()))?;
            for column in statement.column_names() {
                ensure_column(&schema, column)?;
            }
            let key_given =
                statement.value_of(&schema.primary_key).is_some_and(|value| !value.is_null());
            let key_generated = schema.primary_field().is_some_and(|field| field.auto_increment);
            if !key_given && !key_generated {
                return Err(SqliteLedgerError::Invalid(format!(
                    "primary key {} required for {}",
                    schema.primary_key, schema.name
                )));
            }
            let dialect = SqliteLedgerDialect::new(catalog);
            let compiled = statement
                .compile(&dialect)
                .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
            let changed = tx
                .execute(&compiled.sql, params_from_iter(compiled.params.iter().map(SqlParam)))
                .map_err(db_error)?;
            let keys = if changed == 0 {
                Vec::new()
            } else {
                match statement.value_of(&schema.primary_key) {
                    Some(value) if !value.is_null() => vec![value.clone()],
                    _ => vec![TypedScalar::Integer(tx.last_insert_rowid())],
                }
            };
            let outcome = commit_row_versions(tx, &self.database, &schema, &keys)?;
            drop(guard);
            outcome
        };
        if let Some(tx_id) = outcome.tx_id {
            self.audit_commit(tx_id, TxKind::Write, outcome.rows_affected());
        }
        Ok(outcome)
    }

    /// Executes an update and commits one new version per matched row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError::Invalid`] when the update assigns the
    /// primary key or an unknown column, and other errors when it fails.
    pub fn update(&self, statement: &UpdateStatement) -> Result<WriteOutcome, SqliteLedgerError> {
        let outcome = {
            let mut guard = self.lock()?;
            let tx = guard.transaction().map_err(db_error)?;
            let catalog = load_catalog(&tx)?;
            let table = statement.table();
            let schema = catalog
                .get(table)
                .cloned()
                .ok_or_else(|| SqliteLedgerError::UnknownTable(table.to_string()))?;
            for (column, _) in statement.assignments() {
                ensure_column(&schema, column)?;
                if *column == schema.primary_key {
                    return Err(SqliteLedgerError::Invalid(format!(
                        "primary key {column} cannot be updated"
                    )));
                }
            }
            for condition in statement.conditions() {
                ensure_column(&schema, &condition.column)?;
            }
            let dialect = SqliteLedgerDialect::new(catalog);
            let lookup = statement
                .compile_key_lookup(&dialect, &schema.primary_key)
                .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
            let matched = run_query(&tx, &lookup.sql, &lookup.params, Some(&schema))?;
            let keys: Vec<TypedScalar> =
                materialize_rows(&mut matched.cursor(), &self.database, table)
                    .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?
                    .into_iter()
                    .filter_map(|row| row.values().first().cloned())
                    .collect();
            let compiled = statement
                .compile(&dialect)
                .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
            tx.execute(&compiled.sql, params_from_iter(compiled.params.iter().map(SqlParam)))
                .map_err(db_error)?;
            let outcome = commit_row_versions(tx, &self.database, &schema, &keys)?;
            drop(guard);
            outcome
        };
        if let Some(tx_id) = outcome.tx_id {
            self.audit_commit(tx_id, TxKind::Write, outcome.rows_affected());
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Runs a compiled query and buffers its result.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the query fails.
    pub fn query(
        &self,
        statement: &CompiledStatement,
    ) -> Result<SqliteResultSet, SqliteLedgerError> {
        let guard = self.lock()?;
        let schema = load_schema(&guard, &statement.table)?;
        run_query(&guard, &statement.sql, &statement.params, schema.as_ref())
    }

    /// Describes a table.
    fn describe(&self, database: &str, table: &str) -> Result<TableDescription, LedgerError> {
        if database != self.database {
            return Err(LedgerError::DatabaseNotFound(database.to_string()));
        }
        let schema =
            self.table_schema(table)?.ok_or_else(|| LedgerError::TableNotFound(table.to_string()))?;
        let dialect = SqliteLedgerDialect::default();
        let columns = schema
            .fields
            .iter()
            .map(|field| ColumnDescription {
                name: field.name.clone(),
                type_name: dialect.data_type_of(field, field.name == schema.primary_key),
            })
            .collect();
        Ok(TableDescription {
            name: schema.name,
            primary_key: schema.primary_key,
            columns,
        })
    }

    /// Proves `row` against the latest committed version of its key.
    fn verify_latest(
        &self,
        database: &str,
        row: &CanonicalRow,
        table: &str,
        primary_key: &PrimaryKeyValue,
    ) -> Result<(), LedgerError> {
        if database != self.database {
            return Err(LedgerError::DatabaseNotFound(database.to_string()));
        }
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let schema =
            load_schema(&tx, table)?.ok_or_else(|| LedgerError::TableNotFound(table.to_string()))?;
        let history = history_table(table);
        let dialect = SqliteLedgerDialect::default();
        let mut sql = String::from("SELECT ");
        dialect.quote_to(&mut sql, TX_ID_COLUMN);
        sql.push_str(", ");
        dialect.quote_to(&mut sql, ROW_HASH_COLUMN);
        sql.push_str(", ");
        dialect.quote_to(&mut sql, HASH_ALGORITHM_COLUMN);
        sql.push_str(" FROM ");
        dialect.quote_to(&mut sql, &history);
        sql.push_str(" WHERE ");
        dialect.quote_to(&mut sql, &schema.primary_key);
        sql.push_str(" = ?1 ORDER BY ");
        dialect.quote_to(&mut sql, TX_ID_COLUMN);
        sql.push_str(" DESC LIMIT 1");
        let latest: Option<(i64, String, String)> = tx
            .query_row(&sql, params![SqlParam(primary_key.value())], |found| {
                Ok((found.get(0)?, found.get(1)?, found.get(2)?))
            })
            .optional()
            .map_err(db_error)?;
        let Some((tx_id, row_hash, algorithm)) = latest else {
            return Err(LedgerError::RowNotFound(scalar_label(primary_key.value())));
        };
        let stored =
            read_version(&tx, &self.database, &schema, &history, primary_key.value(), Some(tx_id))?
                .ok_or(LedgerError::DataCorrupted)?;
        let algorithm =
            ledger::parse_hash_algorithm(&algorithm).map_err(|_| LedgerError::DataCorrupted)?;
        let stored_key = stored.get(&schema.primary_key).cloned().unwrap_or(TypedScalar::Null);
        let digest = hash_row_snapshot(
            algorithm,
            &RowSnapshot {
                table,
                primary_key: &stored_key,
                columns: &stored,
            },
        )
        .map_err(|err| LedgerError::Remote(err.to_string()))?;
        if digest.value != row_hash {
            return Err(LedgerError::DataCorrupted);
        }
        let committed = u64::try_from(tx_id).map_err(|_| LedgerError::DataCorrupted)?;
        let record = ledger::load_verified_tx(&tx, committed)?.ok_or(LedgerError::DataCorrupted)?;
        let recorded = record.entries.iter().any(|entry| {
            matches!(
                entry,
                TxEntry::Row { table: entry_table, primary_key: entry_key, row_hash: entry_hash }
                    if entry_table == table && *entry_key == stored_key && *entry_hash == row_hash
            )
        });
        if !recorded {
            return Err(LedgerError::DataCorrupted);
        }
        for (key, value) in row.iter() {
            let field = schema
                .fields
                .iter()
                .find(|field| CanonicalColumnKey::new(database, table, &field.name) == *key)
                .ok_or(LedgerError::DataCorrupted)?;
            if stored.get(&field.name) != Some(value) {
                return Err(LedgerError::DataCorrupted);
            }
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(())
    }
}

impl LedgerClient for SqliteLedgerStore {
    fn describe_table(
        &self,
        database: &str,
        table: &str,
    ) -> Result<TableDescription, LedgerError> {
        self.describe(database, table)
    }

    fn verify_row(
        &self,
        database: &str,
        row: &CanonicalRow,
        table: &str,
        primary_key: &PrimaryKeyValue,
    ) -> Result<(), LedgerError> {
        self.verify_latest(database, row, table, primary_key)
    }
}

// ============================================================================
// SECTION: Row Versions
// ============================================================================

/// Hashes and records a new version for each key, then commits.
fn commit_row_versions(
    tx: rusqlite::Transaction<'_>,
    database: &str,
    schema: &TableSchema,
    keys: &[TypedScalar],
) -> Result<WriteOutcome, SqliteLedgerError> {
    if keys.is_empty() {
        tx.commit().map_err(db_error)?;
        return Ok(WriteOutcome {
            tx_id: None,
            primary_keys: Vec::new(),
        });
    }
    let mut versions = Vec::with_capacity(keys.len());
    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        let columns = read_version(&tx, database, schema, &schema.name, key, None)?
            .ok_or_else(|| {
                SqliteLedgerError::Corrupt(format!("written row missing in {}", schema.name))
            })?;
        let stored_key = columns.get(&schema.primary_key).cloned().unwrap_or(TypedScalar::Null);
        let digest = hash_row_snapshot(
            DEFAULT_HASH_ALGORITHM,
            &RowSnapshot {
                table: &schema.name,
                primary_key: &stored_key,
                columns: &columns,
            },
        )
        .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
        entries.push(TxEntry::Row {
            table: schema.name.clone(),
            primary_key: stored_key.clone(),
            row_hash: digest.value.clone(),
        });
        versions.push((stored_key, columns, digest.value));
    }
    let tx_id = ledger::append_tx(&tx, TxKind::Write, &entries)?;
    for (_, columns, row_hash) in &versions {
        insert_history(&tx, schema, tx_id, columns, row_hash)?;
    }
    tx.commit().map_err(db_error)?;
    Ok(WriteOutcome {
        tx_id: Some(tx_id),
        primary_keys: versions.into_iter().map(|(key, _, _)| key).collect(),
    })
}

/// Reads one row of `source` by primary key as a column-name map.
///
/// `source` is the live table or its history; `tx_id` selects a history
/// version.
fn read_version(
    connection: &Connection,
    database: &str,
    schema: &TableSchema,
    source: &str,
    key: &TypedScalar,
    tx_id: Option<i64>,
) -> Result<Option<BTreeMap<String, TypedScalar>>, SqliteLedgerError> {
    let dialect = SqliteLedgerDialect::default();
    let mut sql = String::from("SELECT ");
    for (index, field) in schema.fields.iter().enumerate() {
        if index > 0 {
            sql.push_str(", ");
        }
        dialect.quote_to(&mut sql, &field.name);
    }
    sql.push_str(" FROM ");
    dialect.quote_to(&mut sql, source);
    sql.push_str(" WHERE ");
    dialect.quote_to(&mut sql, &schema.primary_key);
    sql.push_str(" = ?");
    let mut params = vec![key.clone()];
    if let Some(tx_id) = tx_id {
        sql.push_str(" AND ");
        dialect.quote_to(&mut sql, TX_ID_COLUMN);
        sql.push_str(" = ?");
        params.push(TypedScalar::Integer(tx_id));
    }
    let result = run_query(connection, &sql, &params, Some(schema))?;
    let rows = materialize_rows(&mut result.cursor(), database, &schema.name)
        .map_err(|err| SqliteLedgerError::Corrupt(err.to_string()))?;
    Ok(rows.into_iter().next().map(|row| {
        schema
            .fields
            .iter()
            .map(|field| field.name.clone())
            .zip(row.values().iter().cloned())
            .collect()
    }))
}

/// Appends one history version.
fn insert_history(
    connection: &Connection,
    schema: &TableSchema,
    tx_id: u64,
    columns: &BTreeMap<String, TypedScalar>,
    row_hash: &str,
) -> Result<(), SqliteLedgerError> {
    let dialect = SqliteLedgerDialect::default();
    let tx_id = i64::try_from(tx_id)
        .map_err(|_| SqliteLedgerError::Invalid(format!("tx id out of range: {tx_id}")))?;
    let mut sql = String::from("INSERT INTO ");
    dialect.quote_to(&mut sql, &history_table(&schema.name));
    sql.push_str(" (");
    dialect.quote_to(&mut sql, TX_ID_COLUMN);
    sql.push_str(", ");
    dialect.quote_to(&mut sql, ROW_HASH_COLUMN);
    sql.push_str(", ");
    dialect.quote_to(&mut sql, HASH_ALGORITHM_COLUMN);
    let mut values = vec![
        TypedScalar::Integer(tx_id),
        TypedScalar::String(row_hash.to_string()),
        TypedScalar::String(ledger::hash_algorithm_label(DEFAULT_HASH_ALGORITHM).to_string()),
    ];
    for field in &schema.fields {
        sql.push_str(", ");
        dialect.quote_to(&mut sql, &field.name);
        values.push(columns.get(&field.name).cloned().unwrap_or(TypedScalar::Null));
    }
    sql.push_str(") VALUES (");
    sql.push_str(&vec!["?"; values.len()].join(", "));
    sql.push(')');
    connection.execute(&sql, params_from_iter(values.iter().map(SqlParam))).map_err(db_error)?;
    Ok(())
}

/// Runs a query and buffers the result with declared type names.
fn run_query(
    connection: &Connection,
    sql: &str,
    params: &[TypedScalar],
    schema: Option<&TableSchema>,
) -> Result<SqliteResultSet, SqliteLedgerError> {
    let dialect = SqliteLedgerDialect::default();
    let mut statement = connection.prepare(sql).map_err(db_error)?;
    let (columns, type_names): (Vec<String>, Vec<String>) = statement
        .columns()
        .iter()
        .map(|column| {
            let name = column.name().to_string();
            let type_name = column.decl_type().map(str::to_string).or_else(|| {
                schema
                    .and_then(|schema| schema.field_named(&name))
                    .map(|field| dialect.data_type_of(field, false))
            });
            (name, type_name.unwrap_or_else(|| UNDECLARED_TYPE_NAME.to_string()))
        })
        .unzip();
    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor =
        statement.query(params_from_iter(params.iter().map(SqlParam))).map_err(db_error)?;
    while let Some(row) = cursor.next().map_err(db_error)? {
        let mut values = Vec::with_capacity(width);
        for index in 0 .. width {
            values.push(row.get::<_, Value>(index).map_err(db_error)?);
        }
        rows.push(values);
    }
    Ok(SqliteResultSet::new(columns, type_names, rows))
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Loads every catalog entry.
fn load_catalog(
    connection: &Connection,
) -> Result<BTreeMap<String, TableSchema>, SqliteLedgerError> {
    let mut statement =
        connection.prepare("SELECT name, schema_json FROM ledger_tables").map_err(db_error)?;
    let rows = statement
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))
        .map_err(db_error)?;
    let mut catalog = BTreeMap::new();
    for row in rows {
        let (name, bytes) = row.map_err(db_error)?;
        catalog.insert(name, decode_schema(&bytes)?);
    }
    Ok(catalog)
}

/// Loads one catalog entry.
fn load_schema(
    connection: &Connection,
    table: &str,
) -> Result<Option<TableSchema>, SqliteLedgerError> {
    let bytes: Option<Vec<u8>> = connection
        .query_row("SELECT schema_json FROM ledger_tables WHERE name = ?1", params![table], |row| {
            row.get(0)
        })
        .optional()
        .map_err(db_error)?;
    bytes.as_deref().map(decode_schema).transpose()
}

/// Writes a catalog entry; `created_tx` is set only for new tables.
fn save_schema(
    connection: &Connection,
    schema: &TableSchema,
    created_tx: Option<u64>,
) -> Result<(), SqliteLedgerError> {
    let bytes =
        serde_json::to_vec(schema).map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
    match created_tx {
        Some(tx_id) => {
            let tx_id = i64::try_from(tx_id)
                .map_err(|_| SqliteLedgerError::Invalid(format!("tx id out of range: {tx_id}")))?;
            connection
                .execute(
                    "INSERT INTO ledger_tables (name, schema_json, created_tx) VALUES (?1, ?2, ?3)",
                    params![schema.name, bytes, tx_id],
                )
                .map_err(db_error)?;
        }
        None => {
            connection
                .execute(
                    "UPDATE ledger_tables SET schema_json = ?2 WHERE name = ?1",
                    params![schema.name, bytes],
                )
                .map_err(db_error)?;
        }
    }
    Ok(())
}

/// Decodes a stored schema.
fn decode_schema(bytes: &[u8]) -> Result<TableSchema, SqliteLedgerError> {
    serde_json::from_slice(bytes).map_err(|err| SqliteLedgerError::Corrupt(err.to_string()))
}

/// Renders the history table DDL and its key/version index.
fn history_table_sql(schema: &TableSchema, dialect: &SqliteLedgerDialect) -> String {
    let history = history_table(&schema.name);
    let mut sql = String::from("CREATE TABLE ");
    dialect.quote_to(&mut sql, &history);
    sql.push_str(" (");
    dialect.quote_to(&mut sql, TX_ID_COLUMN);
    sql.push_str(" INTEGER NOT NULL REFERENCES ledger_tx(tx_id), ");
    dialect.quote_to(&mut sql, ROW_HASH_COLUMN);
    sql.push_str(" TEXT NOT NULL, ");
    dialect.quote_to(&mut sql, HASH_ALGORITHM_COLUMN);
    sql.push_str(" TEXT NOT NULL");
    for field in &schema.fields {
        sql.push_str(", ");
        dialect.quote_to(&mut sql, &field.name);
        sql.push(' ');
        sql.push_str(&dialect.data_type_of(field, false));
    }
    sql.push_str("); CREATE INDEX ");
    dialect.quote_to(&mut sql, &format!("{history}_key_tx"));
    sql.push_str(" ON ");
    dialect.quote_to(&mut sql, &history);
    sql.push_str(" (");
    dialect.quote_to(&mut sql, &schema.primary_key);
    sql.push_str(", ");
    dialect.quote_to(&mut sql, TX_ID_COLUMN);
    sql.push_str(");");
    sql
}

/// Rejects columns the schema does not declare.
fn ensure_column(schema: &TableSchema, column: &str) -> Result<(), SqliteLedgerError> {
    if schema.field_named(column).is_none() {
        return Err(SqliteLedgerError::Invalid(format!(
            "unknown column {column} in table {}",
            schema.name
        )));
    }
    Ok(())
}

/// Renders a scalar for error messages.
fn scalar_label(value: &TypedScalar) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unprintable>".to_string())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteLedgerError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteLedgerError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteLedgerError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteLedgerError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteLedgerError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteLedgerError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteLedgerError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteLedgerConfig) -> Result<Connection, SqliteLedgerError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteLedgerConfig,
) -> Result<(), SqliteLedgerError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the ledger schema and genesis, or validates an existing store.
fn initialize_schema(connection: &mut Connection, database: &str) -> Result<(), SqliteLedgerError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL, database TEXT NOT NULL);",
    )
    .map_err(db_error)?;
    let meta: Option<(i64, String)> = tx
        .query_row("SELECT version, database FROM store_meta LIMIT 1", params![], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()
        .map_err(db_error)?;
    match meta {
        None => {
            tx.execute(
                "INSERT INTO store_meta (version, database) VALUES (?1, ?2)",
                params![SCHEMA_VERSION, database],
            )
            .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS ledger_tx (
                    tx_id INTEGER PRIMARY KEY,
                    kind TEXT NOT NULL,
                    entries_json BLOB NOT NULL,
                    payload_hash TEXT NOT NULL,
                    prev_hash TEXT,
                    tx_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    committed_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS ledger_tables (
                    name TEXT PRIMARY KEY,
                    schema_json BLOB NOT NULL,
                    created_tx INTEGER NOT NULL,
                    FOREIGN KEY (created_tx) REFERENCES ledger_tx(tx_id)
                );",
            )
            .map_err(db_error)?;
            ledger::append_tx(
                &tx,
                TxKind::Genesis,
                &[TxEntry::Genesis {
                    database: database.to_string(),
                }],
            )?;
        }
        Some((version, bound)) if version == SCHEMA_VERSION => {
            if bound != database {
                return Err(SqliteLedgerError::Invalid(format!(
                    "store is bound to database {bound}, not {database}"
                )));
            }
        }
        Some((version, _)) => {
            return Err(SqliteLedgerError::VersionMismatch(format!(
                "unsupported schema version: {version}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
pub(crate) fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
