// crates/ledgerq-store-sqlite/src/dialect.rs
// ============================================================================
// Module: SQLite Ledger Dialect
// Description: Renders the statement AST for the SQLite ledger layout.
// Purpose: Resolve time-travel table references against version history.
// Dependencies: ledgerq-core
// ============================================================================

//! ## Overview
//! SQLite has no native snapshot reads, so a time-travel qualified table
//! reference is rendered as a derived table over the table's history. For
//! every primary key it keeps the latest version committed before (or at)
//! the named transaction, and is aliased back to the table name so the rest
//! of the statement is unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use ledgerq_core::Dialect;
use ledgerq_core::FieldSchema;
use ledgerq_core::FieldType;
use ledgerq_core::IndexSchema;
use ledgerq_core::OnConflict;
use ledgerq_core::StatementError;
use ledgerq_core::TableSchema;
use ledgerq_core::TimeTravel;
use ledgerq_core::TxMode;

// ============================================================================
// SECTION: Layout Names
// ============================================================================

/// Suffix of the per-table version history table.
pub const HISTORY_SUFFIX: &str = "__history";
/// History column holding the committing transaction id.
pub const TX_ID_COLUMN: &str = "__tx_id";
/// History column holding the row version hash.
pub const ROW_HASH_COLUMN: &str = "__row_hash";
/// History column holding the row hash algorithm label.
pub const HASH_ALGORITHM_COLUMN: &str = "__hash_algorithm";

/// Returns the history table name for `table`.
#[must_use]
pub fn history_table(table: &str) -> String {
    format!("{table}{HISTORY_SUFFIX}")
}

// ============================================================================
// SECTION: Dialect
// ============================================================================

/// SQLite dialect bound to a snapshot of the ledger catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqliteLedgerDialect {
    /// Table schemas by name.
    tables: BTreeMap<String, TableSchema>,
}

impl SqliteLedgerDialect {
    /// Creates a dialect over a catalog snapshot.
    #[must_use]
    pub const fn new(tables: BTreeMap<String, TableSchema>) -> Self {
        Self {
            tables,
        }
    }

    /// Returns the catalog entry for `table`.
    #[must_use]
    pub fn table(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table)
    }

    /// Appends the derived table selecting the snapshot of `schema`.
    fn write_snapshot(&self, out: &mut String, schema: &TableSchema, time_travel: &TimeTravel) {
        let history = history_table(&schema.name);
        let bound = match time_travel.mode() {
            TxMode::Before => "<",
            TxMode::After => "<=",
        };
        out.push_str("(SELECT ");
        for (index, field) in schema.fields.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            out.push_str("h.");
            self.quote_to(out, &field.name);
        }
        out.push_str(" FROM ");
        self.quote_to(out, &history);
        out.push_str(" AS h WHERE h.");
        self.quote_to(out, TX_ID_COLUMN);
        out.push_str(" = (SELECT MAX(v.");
        self.quote_to(out, TX_ID_COLUMN);
        out.push_str(") FROM ");
        self.quote_to(out, &history);
        out.push_str(" AS v WHERE v.");
        self.quote_to(out, &schema.primary_key);
        out.push_str(" = h.");
        self.quote_to(out, &schema.primary_key);
        out.push_str(" AND v.");
        self.quote_to(out, TX_ID_COLUMN);
        out.push(' ');
        out.push_str(bound);
        out.push(' ');
        out.push_str(&time_travel.tx_id().to_string());
        out.push_str(")) AS ");
        self.quote_to(out, &schema.name);
    }
}

impl Dialect for SqliteLedgerDialect {
    fn quote_to(&self, out: &mut String, identifier: &str) {
        out.push('"');
        out.push_str(&identifier.replace('"', "\"\""));
        out.push('"');
    }

    fn write_table_ref(
        &self,
        out: &mut String,
        table: &str,
        time_travel: Option<&TimeTravel>,
    ) -> Result<(), StatementError> {
        match time_travel {
            None => self.quote_to(out, table),
            Some(time_travel) => {
                let schema = self
                    .tables
                    .get(table)
                    .ok_or_else(|| StatementError::UnknownTable(table.to_string()))?;
                self.write_snapshot(out, schema, time_travel);
            }
        }
        Ok(())
    }

    fn write_upsert_into(
        &self,
        out: &mut String,
        modifier: Option<&str>,
        table: &str,
    ) -> Result<(), StatementError> {
        if let Some(modifier) = modifier.filter(|modifier| !modifier.trim().is_empty()) {
            return Err(StatementError::Invalid(format!(
                "upsert modifier not supported by sqlite: {modifier}"
            )));
        }
        out.push_str("INSERT OR REPLACE INTO ");
        self.quote_to(out, table);
        Ok(())
    }

    fn write_on_conflict(&self, out: &mut String, on_conflict: OnConflict) {
        match on_conflict {
            OnConflict::DoNothing => out.push_str("ON CONFLICT DO NOTHING"),
        }
    }

    fn data_type_of(&self, field: &FieldSchema, _is_primary_key: bool) -> String {
        match field.field_type {
            FieldType::Bool => "BOOLEAN",
            FieldType::Int | FieldType::Uint => "INTEGER",
            FieldType::String => "VARCHAR",
            FieldType::Bytes => "BLOB",
            FieldType::Time => "TIMESTAMP",
        }
        .to_string()
    }

    fn write_primary_key(&self, out: &mut String, column: &str) {
        out.push_str("PRIMARY KEY (");
        self.quote_to(out, column);
        out.push(')');
    }

    fn write_create_index(&self, out: &mut String, table: &str, index: &IndexSchema) {
        out.push_str(if index.unique { "CREATE UNIQUE INDEX " } else { "CREATE INDEX " });
        self.quote_to(out, &index.name);
        out.push_str(" ON ");
        self.quote_to(out, table);
        out.push_str(" (");
        self.quote_to(out, &index.column);
        out.push(')');
    }
}
