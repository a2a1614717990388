// crates/ledgerq-core/src/core/dialect.rs
// ============================================================================
// Module: SQL Dialects
// Description: Dialect hooks for statement and DDL rendering.
// Purpose: Render table references, upserts, and DDL for a target engine.
// Dependencies: crate::core::{schema, statement, time_travel}, serde
// ============================================================================

//! ## Overview
//! A [`Dialect`] owns every engine-specific rendering decision. The
//! [`LedgerDialect`] targets the tamper-evident ledger's SQL surface, where
//! snapshot reads are written as `t BEFORE TX 9` or `(t BEFORE TX 9)`.
//! Storage backends supply their own dialect for the same statement AST.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::schema::FieldSchema;
use crate::core::schema::FieldType;
use crate::core::schema::IndexSchema;
use crate::core::schema::TableSchema;
use crate::core::statement::OnConflict;
use crate::core::statement::StatementError;
use crate::core::time_travel::TimeTravel;

// ============================================================================
// SECTION: Dialect Trait
// ============================================================================

/// Engine-specific rendering hooks.
pub trait Dialect {
    /// Appends `identifier` quoted for the engine.
    fn quote_to(&self, out: &mut String, identifier: &str);

    /// Appends the bind variable for the 1-based parameter `position`.
    fn bind_var_to(&self, out: &mut String, _position: usize) {
        out.push('?');
    }

    /// Appends the table reference, decorated with the time-travel qualifier.
    ///
    /// # Errors
    ///
    /// Returns [`StatementError::UnknownTable`] when the dialect needs catalog
    /// information it does not have.
    fn write_table_ref(
        &self,
        out: &mut String,
        table: &str,
        time_travel: Option<&TimeTravel>,
    ) -> Result<(), StatementError>;

    /// Appends the upsert prefix up to and including the target table.
    ///
    /// # Errors
    ///
    /// Returns [`StatementError::Invalid`] when the modifier is rejected.
    fn write_upsert_into(
        &self,
        out: &mut String,
        modifier: Option<&str>,
        table: &str,
    ) -> Result<(), StatementError>;

    /// Appends the conflict clause.
    fn write_on_conflict(&self, out: &mut String, on_conflict: OnConflict);

    /// Returns the column type for a field declaration.
    fn data_type_of(&self, field: &FieldSchema, is_primary_key: bool) -> String;

    /// Appends the table-level primary-key clause.
    fn write_primary_key(&self, out: &mut String, column: &str);

    /// Appends a CREATE INDEX statement.
    fn write_create_index(&self, out: &mut String, table: &str, index: &IndexSchema);
}

// ============================================================================
// SECTION: DDL Rendering
// ============================================================================

/// Renders `CREATE TABLE` for a schema.
#[must_use]
pub fn create_table_sql(schema: &TableSchema, dialect: &dyn Dialect) -> String {
    let mut out = String::from("CREATE TABLE ");
    dialect.quote_to(&mut out, &schema.name);
    out.push_str(" (");
    for field in &schema.fields {
        dialect.quote_to(&mut out, &field.name);
        out.push(' ');
        out.push_str(&dialect.data_type_of(field, field.name == schema.primary_key));
        out.push(',');
    }
    dialect.write_primary_key(&mut out, &schema.primary_key);
    out.push(')');
    out
}

/// Renders `CREATE INDEX` for one index of a schema.
#[must_use]
pub fn create_index_sql(table: &str, index: &IndexSchema, dialect: &dyn Dialect) -> String {
    let mut out = String::new();
    dialect.write_create_index(&mut out, table, index);
    out
}

// ============================================================================
// SECTION: Ledger Dialect
// ============================================================================

/// How the ledger dialect writes a time-travel qualified table reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeTravelStyle {
    /// `t BEFORE TX 9`.
    #[default]
    Bare,
    /// `(t BEFORE TX 9)`.
    Parenthesized,
}

/// Dialect for the ledger's native SQL surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerDialect {
    /// Qualified table-reference style.
    time_travel_style: TimeTravelStyle,
}

impl LedgerDialect {
    /// Creates a dialect with the given qualifier style.
    #[must_use]
    pub const fn new(time_travel_style: TimeTravelStyle) -> Self {
        Self {
            time_travel_style,
        }
    }

    /// Returns the qualifier style.
    #[must_use]
    pub const fn time_travel_style(&self) -> TimeTravelStyle {
        self.time_travel_style
    }
}

impl Dialect for LedgerDialect {
    fn quote_to(&self, out: &mut String, identifier: &str) {
        out.push_str(identifier);
    }

    fn write_table_ref(
        &self,
        out: &mut String,
        table: &str,
        time_travel: Option<&TimeTravel>,
    ) -> Result<(), StatementError> {
        match (time_travel, self.time_travel_style) {
            (None, _) => self.quote_to(out, table),
            (Some(time_travel), TimeTravelStyle::Bare) => {
                self.quote_to(out, table);
                out.push(' ');
                out.push_str(&time_travel.to_string());
            }
            (Some(time_travel), TimeTravelStyle::Parenthesized) => {
                out.push('(');
                self.quote_to(out, table);
                out.push(' ');
                out.push_str(&time_travel.to_string());
                out.push(')');
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
        out.push_str("UPSERT ");
        if let Some(modifier) = modifier.map(str::trim).filter(|modifier| !modifier.is_empty()) {
            if !modifier.chars().all(|ch| ch.is_ascii_alphabetic() || ch == ' ') {
                return Err(StatementError::Invalid(format!("invalid upsert modifier: {modifier}")));
            }
            out.push_str(modifier);
            out.push(' ');
        }
        out.push_str("INTO ");
        self.quote_to(out, table);
        Ok(())
    }

    fn write_on_conflict(&self, out: &mut String, on_conflict: OnConflict) {
        match on_conflict {
            OnConflict::DoNothing => out.push_str("ON CONFLICT DO NOTHING"),
        }
    }

    fn data_type_of(&self, field: &FieldSchema, is_primary_key: bool) -> String {
        let sized = |base: &str| match field.size {
            Some(size) if size > 0 => format!("{base}[{size}]"),
            _ => base.to_string(),
        };
        match field.field_type {
            FieldType::Bool => "BOOLEAN".to_string(),
            FieldType::Int | FieldType::Uint => {
                if field.auto_increment && is_primary_key {
                    "INTEGER AUTO_INCREMENT".to_string()
                } else {
                    "INTEGER".to_string()
                }
            }
            FieldType::String => sized("VARCHAR"),
            FieldType::Bytes => sized("BLOB"),
            FieldType::Time => "TIMESTAMP".to_string(),
        }
    }

    fn write_primary_key(&self, out: &mut String, column: &str) {
        out.push_str("PRIMARY KEY ");
        self.quote_to(out, column);
    }

    fn write_create_index(&self, out: &mut String, table: &str, index: &IndexSchema) {
        out.push_str(if index.unique { "CREATE UNIQUE INDEX ON " } else { "CREATE INDEX ON " });
        self.quote_to(out, table);
        out.push_str(" (");
        self.quote_to(out, &index.column);
        out.push(')');
    }
}
