// crates/ledgerq-core/src/lib.rs
// ============================================================================
// Module: ledgerq Core Library
// Description: Public API surface for verified and time-travel queries.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! ledgerq sits between a relational query layer and an append-only,
//! tamper-evident ledger. It canonicalizes result rows, proves them against
//! the ledger after each query, and scopes reads to past transactions with
//! `BEFORE TX` / `AFTER TX` qualifiers. It is backend-agnostic and
//! integrates through the [`ResultCursor`] and [`LedgerClient`] interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::AdapterError;
pub use interfaces::CORRUPTED_DATA_MESSAGE;
pub use interfaces::CursorError;
pub use interfaces::LedgerClient;
pub use interfaces::LedgerError;
pub use interfaces::ResultCursor;
pub use runtime::AuditSink;
pub use runtime::CanonicalRows;
pub use runtime::FileAuditSink;
pub use runtime::LedgerAuditEvent;
pub use runtime::MaterializeError;
pub use runtime::NoopAuditSink;
pub use runtime::OperationErrors;
pub use runtime::QueryContext;
pub use runtime::StderrAuditSink;
pub use runtime::VerificationError;
pub use runtime::VerificationHook;
pub use runtime::map_ledger_error;
pub use runtime::materialize_rows;
