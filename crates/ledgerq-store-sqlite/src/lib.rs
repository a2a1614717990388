// crates/ledgerq-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Tamper-evident, transaction-versioned tables using SQLite.
// Purpose: Provide a ledger client and query session for ledgerq.
// Dependencies: ledgerq-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`LedgerClient`] implementation. Every
//! committed row version is kept in a history table and referenced by a
//! hash-chained transaction log, so results can be proven after the fact and
//! read as of any past transaction. [`LedgerSession`] layers statement
//! rendering and post-query verification on top.
//!
//! [`LedgerClient`]: ledgerq_core::LedgerClient

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cursor;
pub mod dialect;
pub mod ledger;
pub mod session;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cursor::SqliteCursor;
pub use cursor::SqliteResultSet;
pub use dialect::SqliteLedgerDialect;
pub use ledger::LedgerTx;
pub use ledger::TxEntry;
pub use ledger::TxKind;
pub use session::LedgerSession;
pub use session::SessionError;
pub use store::SqliteLedgerConfig;
pub use store::SqliteLedgerError;
pub use store::SqliteLedgerStore;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::WriteOutcome;
