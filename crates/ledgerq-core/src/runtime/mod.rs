// crates/ledgerq-core/src/runtime/mod.rs
// ============================================================================
// Module: ledgerq Runtime
// Description: Row materialization, verification hook, and audit sinks.
// Purpose: Run the post-query pipeline against any cursor and ledger client.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules turn cursors into canonical rows and prove those rows
//! against a ledger. Every storage backend calls into the same pipeline.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod materializer;
pub mod verify;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::LedgerAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use materializer::CanonicalRows;
pub use materializer::MaterializeError;
pub use materializer::materialize_rows;
pub use materializer::rows;
pub use verify::OperationErrors;
pub use verify::QueryContext;
pub use verify::VerificationError;
pub use verify::VerificationHook;
pub use verify::map_ledger_error;
