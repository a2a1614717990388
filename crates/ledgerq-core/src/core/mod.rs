// crates/ledgerq-core/src/core/mod.rs
// ============================================================================
// Module: ledgerq Core Types
// Description: Canonical rows, scalars, schemas, statements, and hashing.
// Purpose: Provide the stable data model shared by runtimes and stores.
// Dependencies: serde, serde_jcs, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! Core types define the canonical row model, time-travel directives, the
//! statement AST with its dialects, and the hashing used for tamper evidence.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod column;
pub mod dialect;
pub mod hashing;
pub mod row;
pub mod scalar;
pub mod schema;
pub mod session;
pub mod statement;
pub mod time_travel;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use column::CanonicalColumnKey;
pub use dialect::Dialect;
pub use dialect::LedgerDialect;
pub use dialect::TimeTravelStyle;
pub use dialect::create_index_sql;
pub use dialect::create_table_sql;
pub use hashing::ChainLink;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::RowSnapshot;
pub use row::CanonicalRow;
pub use row::PrimaryKeyValue;
pub use row::RowError;
pub use row::extract_primary_key;
pub use scalar::ScalarKind;
pub use scalar::TypedScalar;
pub use schema::ColumnDescription;
pub use schema::FieldSchema;
pub use schema::FieldType;
pub use schema::IndexSchema;
pub use schema::SchemaError;
pub use schema::TableDescription;
pub use schema::TableSchema;
pub use session::DEFAULT_DATABASE;
pub use session::SessionConfig;
pub use statement::CompiledStatement;
pub use statement::Condition;
pub use statement::ConditionValue;
pub use statement::FromClause;
pub use statement::FromExpression;
pub use statement::InsertStatement;
pub use statement::OnConflict;
pub use statement::SelectStatement;
pub use statement::StatementError;
pub use statement::StatementModifier;
pub use statement::UpdateStatement;
pub use statement::UpsertClause;
pub use statement::eq;
pub use statement::in_list;
pub use time_travel::TimeTravel;
pub use time_travel::TxMode;
pub use time_travel::after_tx;
pub use time_travel::before_tx;
