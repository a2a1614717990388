// crates/ledgerq-core/src/core/schema.rs
// ============================================================================
// Module: Table Schemas
// Description: Declarative table, field, and index definitions.
// Purpose: Drive DDL rendering, migrations, and ledger table descriptions.
// Dependencies: crate::core::scalar, serde, thiserror
// ============================================================================

//! ## Overview
//! [`TableSchema`] is the input to migrations and DDL rendering. Exactly one
//! field is the primary key. [`TableDescription`] is the ledger's view of an
//! existing table and is what `describe_table` returns.
//!
//! Security posture: identifiers are rendered into SQL unescaped by the ledger
//! dialect, so [`TableSchema::validate`] restricts them to
//! `[A-Za-z_][A-Za-z0-9_]*`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::scalar::ScalarKind;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum identifier length accepted for tables, columns, and indexes.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Identifier is empty, too long, or contains disallowed characters.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// Table declares no fields.
    #[error("table {0} has no fields")]
    NoFields(String),
    /// A field name repeats.
    #[error("duplicate field {field} in table {table}")]
    DuplicateField {
        /// Table name.
        table: String,
        /// Repeated field name.
        field: String,
    },
    /// Primary key does not name a declared field.
    #[error("primary key {primary_key} is not a field of table {table}")]
    UnknownPrimaryKey {
        /// Table name.
        table: String,
        /// Declared primary-key column.
        primary_key: String,
    },
    /// Index names an undeclared column.
    #[error("index {index} references unknown column {column}")]
    UnknownIndexColumn {
        /// Index name.
        index: String,
        /// Referenced column.
        column: String,
    },
    /// Auto-increment declared on a non-integer or non-key field.
    #[error("auto increment requires an integer primary key: {0}")]
    InvalidAutoIncrement(String),
}

// ============================================================================
// SECTION: Field Types
// ============================================================================

/// Declared field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Unsigned integer.
    Uint,
    /// UTF-8 string.
    String,
    /// Byte sequence.
    Bytes,
    /// Timestamp.
    Time,
}

impl FieldType {
    /// Returns the scalar kind values of this type decode into.
    #[must_use]
    pub const fn scalar_kind(self) -> ScalarKind {
        match self {
            Self::Bool => ScalarKind::Boolean,
            Self::Int | Self::Uint => ScalarKind::Integer,
            Self::String => ScalarKind::String,
            Self::Bytes => ScalarKind::Bytes,
            Self::Time => ScalarKind::Timestamp,
        }
    }

    /// Returns true for integer types.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::Uint)
    }
}

/// Single field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub field_type: FieldType,
    /// Optional maximum size for strings and bytes.
    #[serde(default)]
    pub size: Option<u32>,
    /// Whether the ledger assigns values automatically.
    #[serde(default)]
    pub auto_increment: bool,
}

impl FieldSchema {
    /// Declares a field without size or auto-increment.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            size: None,
            auto_increment: false,
        }
    }

    /// Sets the maximum size.
    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Marks the field auto-increment.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Returns the scalar kind values of this field decode into.
    #[must_use]
    pub const fn scalar_kind(&self) -> ScalarKind {
        self.field_type.scalar_kind()
    }
}

/// Secondary index declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index name.
    pub name: String,
    /// Indexed column.
    pub column: String,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
}

impl IndexSchema {
    /// Declares a non-unique index.
    #[must_use]
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            unique: false,
        }
    }

    /// Marks the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

// ============================================================================
// SECTION: Table Schema
// ============================================================================

/// Table declaration.
///
/// # Invariants
/// - After [`TableSchema::validate`], `primary_key` names exactly one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Primary-key column name.
    pub primary_key: String,
    /// Secondary indexes.
    #[serde(default)]
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    /// Starts a table declaration keyed by `primary_key`.
    #[must_use]
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            primary_key: primary_key.into(),
            indexes: Vec::new(),
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends an index.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Returns the primary-key field when declared.
    #[must_use]
    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.field_named(&self.primary_key)
    }

    /// Returns the field named `name`.
    #[must_use]
    pub fn field_named(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Validates identifiers, field uniqueness, and key references.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] for the first violation found.
    pub fn validate(&self) -> Result<(), SchemaError> {
        validate_identifier(&self.name)?;
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields(self.name.clone()));
        }
        for (position, field) in self.fields.iter().enumerate() {
            validate_identifier(&field.name)?;
            if self.fields[.. position].iter().any(|prior| prior.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    table: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if field.auto_increment
                && (!field.field_type.is_integer() || field.name != self.primary_key)
            {
                return Err(SchemaError::InvalidAutoIncrement(field.name.clone()));
            }
        }
        if self.primary_field().is_none() {
            return Err(SchemaError::UnknownPrimaryKey {
                table: self.name.clone(),
                primary_key: self.primary_key.clone(),
            });
        }
        for index in &self.indexes {
            validate_identifier(&index.name)?;
            if self.field_named(&index.column).is_none() {
                return Err(SchemaError::UnknownIndexColumn {
                    index: index.name.clone(),
                    column: index.column.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Validates a SQL identifier against `[A-Za-z_][A-Za-z0-9_]*`.
///
/// Identifiers beginning with a double underscore are reserved for ledger
/// bookkeeping columns.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidIdentifier`] when the identifier is rejected.
pub fn validate_identifier(identifier: &str) -> Result<(), SchemaError> {
    let mut chars = identifier.chars();
    let valid_head = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    let valid_tail = chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if !valid_head
        || !valid_tail
        || identifier.len() > MAX_IDENTIFIER_LENGTH
        || identifier.starts_with("__")
    {
        return Err(SchemaError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Table Descriptions
// ============================================================================

/// Column as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    /// Column name.
    pub name: String,
    /// Database type name, e.g. `VARCHAR` or `INTEGER`.
    pub type_name: String,
}

/// Ledger-side table description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    /// Table name.
    pub name: String,
    /// Primary-key column name.
    pub primary_key: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDescription>,
}

impl TableDescription {
    /// Returns the column named `name`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescription> {
        self.columns.iter().find(|column| column.name == name)
    }
}
