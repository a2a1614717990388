// crates/ledgerq-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for ledgerq-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::path::Path;

use ledgerq_config::AuditSinkKind;
use ledgerq_config::LedgerqConfig;

/// Parses a TOML string into a `LedgerqConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<LedgerqConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<LedgerqConfig, toml::de::Error> {
    config_from_toml("")
}

/// Returns a config whose store lives in `dir` with audit disabled.
pub fn config_in(dir: &Path) -> Result<LedgerqConfig, toml::de::Error> {
    let mut config = minimal_config()?;
    config.store.path = dir.join("ledger.sqlite");
    config.audit.sink = AuditSinkKind::None;
    Ok(config)
}
