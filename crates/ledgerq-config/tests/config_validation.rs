// crates/ledgerq-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Validate ledgerq.toml parsing, defaults, and limits.
// Purpose: Ensure configuration fails closed on invalid input.
// Dependencies: ledgerq-config, ledgerq-core, tempfile, toml
// ============================================================================

//! ## Overview
//! Parses and validates ledgerq configuration from strings and files, and
//! opens sessions from validated configs.

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

mod common;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;

use ledgerq_config::AuditSinkKind;
use ledgerq_config::ConfigError;
use ledgerq_config::LedgerqConfig;
use ledgerq_config::MAX_CONFIG_FILE_SIZE;
use ledgerq_core::FieldSchema;
use ledgerq_core::FieldType;
use ledgerq_core::InsertStatement;
use ledgerq_core::SelectStatement;
use ledgerq_core::TableSchema;
use ledgerq_core::TimeTravelStyle;
use ledgerq_core::before_tx;
use ledgerq_store_sqlite::SqliteStoreMode;
use ledgerq_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn empty_config_uses_defaults() {
    let config = common::minimal_config().unwrap();
    assert_eq!(config.session.database, "defaultdb");
    assert!(!config.session.verify);
    assert_eq!(config.store.path, PathBuf::from("ledgerq.sqlite"));
    assert_eq!(config.store.busy_timeout_ms, 5_000);
    assert_eq!(config.store.journal_mode, SqliteStoreMode::Wal);
    assert_eq!(config.store.sync_mode, SqliteSyncMode::Full);
    assert_eq!(config.audit.sink, AuditSinkKind::Stderr);
    assert_eq!(config.dialect.time_travel_style, TimeTravelStyle::Bare);
    config.validate().unwrap();
}

#[test]
fn full_config_parses_every_section() {
    let config = common::config_from_toml(
        r#"
[session]
database = "ledger"
verify = true

[store]
path = "data/ledger.sqlite"
busy_timeout_ms = 2000
journal_mode = "delete"
sync_mode = "normal"

[audit]
sink = "file"
path = "audit.jsonl"

[dialect]
time_travel_style = "parenthesized"
"#,
    )
    .unwrap();
    assert_eq!(config.session.database, "ledger");
    assert!(config.session.verify);
    assert_eq!(config.store.journal_mode, SqliteStoreMode::Delete);
    assert_eq!(config.store.sync_mode, SqliteSyncMode::Normal);
    assert_eq!(config.audit.path, Some(PathBuf::from("audit.jsonl")));
    assert_eq!(config.ledger_dialect().time_travel_style(), TimeTravelStyle::Parenthesized);
    config.validate().unwrap();
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(common::config_from_toml("[session]\nverfy = true\n").is_err());
    assert!(common::config_from_toml("[storage]\npath = \"x\"\n").is_err());
}

#[test]
fn unknown_enum_values_are_rejected() {
    assert!(common::config_from_toml("[audit]\nsink = \"syslog\"\n").is_err());
    assert!(common::config_from_toml("[store]\njournal_mode = \"memory\"\n").is_err());
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn invalid_database_name_fails_closed() {
    for database in ["", "two words", "__reserved", "1db"] {
        let mut config = common::minimal_config().unwrap();
        config.session.database = database.to_string();
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid(_))), "database {database:?} accepted");
    }
}

#[test]
fn file_sink_requires_path() {
    let config = common::config_from_toml("[audit]\nsink = \"file\"\n").unwrap();
    let result = config.validate();
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn audit_path_requires_file_sink() {
    let config =
        common::config_from_toml("[audit]\nsink = \"none\"\npath = \"audit.jsonl\"\n").unwrap();
    let result = config.validate();
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn zero_busy_timeout_is_rejected() {
    let config = common::config_from_toml("[store]\nbusy_timeout_ms = 0\n").unwrap();
    let error = config.validate().unwrap_err();
    assert!(error.to_string().contains("busy_timeout_ms"));
}

#[test]
fn empty_store_path_is_rejected() {
    let config = common::config_from_toml("[store]\npath = \"  \"\n").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

// ============================================================================
// SECTION: Loading
// ============================================================================

#[test]
fn load_reads_explicit_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledgerq.toml");
    fs::write(&path, "[session]\ndatabase = \"ledger\"\n").unwrap();
    let config = LedgerqConfig::load(Some(&path)).unwrap();
    assert_eq!(config.session.database, "ledger");
}

#[test]
fn load_reports_missing_file() {
    let temp = TempDir::new().unwrap();
    let result = LedgerqConfig::load(Some(&temp.path().join("missing.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn load_rejects_oversized_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledgerq.toml");
    let padding = "#".repeat(MAX_CONFIG_FILE_SIZE + 1);
    fs::write(&path, padding).unwrap();
    let result = LedgerqConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn load_rejects_non_utf8() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledgerq.toml");
    fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
    let result = LedgerqConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn load_reports_parse_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledgerq.toml");
    fs::write(&path, "[session\n").unwrap();
    let result = LedgerqConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn load_rejects_overlong_path_component() {
    let path = PathBuf::from(format!("./{}.toml", "a".repeat(300)));
    let result = LedgerqConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

// ============================================================================
// SECTION: Sessions
// ============================================================================

#[test]
fn open_session_writes_audit_file() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config_in(temp.path()).unwrap();
    let audit_path = temp.path().join("audit.jsonl");
    config.audit.sink = AuditSinkKind::File;
    config.audit.path = Some(audit_path.clone());
    config.session.verify = true;
    let session = config.open_session().unwrap();
    let schema = TableSchema::new("notes", "id")
        .field(FieldSchema::new("id", FieldType::Int))
        .field(FieldSchema::new("body", FieldType::String));
    session.auto_migrate(&schema).unwrap();
    let insert = InsertStatement::new("notes").value("id", 1_i64).value("body", "hello");
    session.insert(&insert).unwrap();
    let rows = session.query(&SelectStatement::new("notes")).unwrap();
    assert_eq!(rows.len(), 1);
    let log = fs::read_to_string(&audit_path).unwrap();
    assert!(log.contains("\"tx_committed\""));
    assert!(log.contains("\"verification_passed\""));
}

#[test]
fn open_session_rejects_invalid_config() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config_in(temp.path()).unwrap();
    config.store.busy_timeout_ms = 0;
    assert!(matches!(config.open_session(), Err(ConfigError::Invalid(_))));
}

#[test]
fn configured_dialect_renders_time_travel_style() {
    let config =
        common::config_from_toml("[dialect]\ntime_travel_style = \"parenthesized\"\n").unwrap();
    let compiled = SelectStatement::new("entities")
        .time_travel(before_tx(9))
        .compile(&config.ledger_dialect())
        .unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM (entities BEFORE TX 9)");
    let bare = common::minimal_config().unwrap().ledger_dialect();
    let compiled =
        SelectStatement::new("entities").time_travel(before_tx(9)).compile(&bare).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM entities BEFORE TX 9");
}

#[test]
fn opened_session_renders_ledger_sql_in_configured_style() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config_in(temp.path()).unwrap();
    config.dialect.time_travel_style = TimeTravelStyle::Parenthesized;
    let session = config.open_session().unwrap();
    assert_eq!(session.ledger_dialect().time_travel_style(), TimeTravelStyle::Parenthesized);
    assert_eq!(session.config(), &config.session);
    assert_eq!(session.current_database(), "defaultdb");

    let snapshot = SelectStatement::new("entities").time_travel(before_tx(9));
    let compiled = session.ledger_sql(&snapshot).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM (entities BEFORE TX 9)");
    assert_eq!(compiled.time_travel, Some(before_tx(9)));

    let default_session = common::config_in(temp.path()).unwrap().open_session().unwrap();
    let compiled = default_session.ledger_sql(&snapshot).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM entities BEFORE TX 9");
}
