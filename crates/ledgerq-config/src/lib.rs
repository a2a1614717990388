// crates/ledgerq-config/src/lib.rs
// ============================================================================
// Module: ledgerq Config Library
// Description: Canonical config model and validation for ledgerq.
// Purpose: Single source of truth for ledgerq.toml semantics.
// Dependencies: ledgerq-core, ledgerq-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `ledgerq-config` defines the configuration model for ledgerq sessions:
//! the database name and verification flag, the `SQLite` ledger store, the
//! audit sink, and the ledger dialect. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
