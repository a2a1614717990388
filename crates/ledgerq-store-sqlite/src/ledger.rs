// crates/ledgerq-store-sqlite/src/ledger.rs
// ============================================================================
// Module: Ledger Transaction Log
// Description: Hash-chained transaction records stored in SQLite.
// Purpose: Give every committed change a transaction id and tamper evidence.
// Dependencies: ledgerq-core, rusqlite, serde, serde_json
// ============================================================================

//! ## Overview
//! Every change commits exactly one row of `ledger_tx`. Transaction ids are
//! dense and start at 1 with the genesis transaction. Each record stores the
//! canonical JSON of its entries, the digest of those entries, the previous
//! transaction hash, and its own hash over all of these.
//!
//! Security posture: records are re-hashed on every read that relies on them;
//! stored hashes are never trusted on their own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ledgerq_core::DEFAULT_HASH_ALGORITHM;
use ledgerq_core::HashAlgorithm;
use ledgerq_core::TypedScalar;
use ledgerq_core::hashing::ChainLink;
use ledgerq_core::hashing::canonical_json_bytes;
use ledgerq_core::hashing::hash_bytes;
use ledgerq_core::hashing::hash_chain_link;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;

use crate::store::SqliteLedgerError;
use crate::store::db_error;
use crate::store::unix_millis;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// First transaction of a new store.
    Genesis,
    /// Schema change.
    Ddl,
    /// Row writes.
    Write,
}

impl TxKind {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Genesis => "genesis",
            Self::Ddl => "ddl",
            Self::Write => "write",
        }
    }

    /// Parses a stored label.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError::Corrupt`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, SqliteLedgerError> {
        match label {
            "genesis" => Ok(Self::Genesis),
            "ddl" => Ok(Self::Ddl),
            "write" => Ok(Self::Write),
            other => Err(SqliteLedgerError::Corrupt(format!("unknown tx kind: {other}"))),
        }
    }
}

/// One change recorded by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum TxEntry {
    /// Store creation.
    Genesis {
        /// Database name bound to the store.
        database: String,
    },
    /// Schema statement.
    Ddl {
        /// Affected table.
        table: String,
        /// Executed statement.
        statement: String,
    },
    /// New row version.
    Row {
        /// Affected table.
        table: String,
        /// Primary-key value of the row.
        primary_key: TypedScalar,
        /// Hex digest of the row version.
        row_hash: String,
    },
}

/// Stored transaction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTx {
    /// Transaction id.
    pub tx_id: u64,
    /// Transaction kind.
    pub kind: TxKind,
    /// Decoded entries.
    pub entries: Vec<TxEntry>,
    /// Previous transaction hash, absent for genesis.
    pub prev_hash: Option<String>,
    /// Stored transaction hash.
    pub tx_hash: String,
}

/// Raw transaction row as stored.
struct StoredTx {
    /// Transaction id.
    tx_id: i64,
    /// Kind label.
    kind: String,
    /// Canonical entries JSON.
    entries_json: Vec<u8>,
    /// Stored entries digest.
    payload_hash: String,
    /// Stored previous hash.
    prev_hash: Option<String>,
    /// Stored transaction hash.
    tx_hash: String,
    /// Hash algorithm label.
    hash_algorithm: String,
    /// Commit timestamp (milliseconds since epoch).
    committed_at: i64,
}

// ============================================================================
// SECTION: Append
// ============================================================================

/// Appends a transaction after the current chain head and returns its id.
///
/// # Errors
///
/// Returns [`SqliteLedgerError`] when hashing or the insert fails.
pub fn append_tx(
    tx: &Transaction<'_>,
    kind: TxKind,
    entries: &[TxEntry],
) -> Result<u64, SqliteLedgerError> {
    let head: Option<(i64, String)> = tx
        .query_row("SELECT tx_id, tx_hash FROM ledger_tx ORDER BY tx_id DESC LIMIT 1", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()
        .map_err(db_error)?;
    let tx_id = match &head {
        None => 1,
        Some((last, _)) => last
            .checked_add(1)
            .ok_or_else(|| SqliteLedgerError::Corrupt("tx id overflow".to_string()))?,
    };
    let tx_id_u64 = u64::try_from(tx_id)
        .map_err(|_| SqliteLedgerError::Corrupt(format!("negative tx id {tx_id}")))?;
    let entries_json = canonical_json_bytes(entries)
        .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
    let payload_hash = hash_bytes(DEFAULT_HASH_ALGORITHM, &entries_json);
    let committed_at = unix_millis();
    let prev_hash = head.map(|(_, hash)| hash);
    let link = ChainLink {
        tx_id: tx_id_u64,
        kind: kind.as_str(),
        payload_hash: &payload_hash.value,
        prev_hash: prev_hash.as_deref(),
        committed_at_ms: committed_at,
    };
    let tx_hash = hash_chain_link(DEFAULT_HASH_ALGORITHM, &link)
        .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
    tx.execute(
        "INSERT INTO ledger_tx (tx_id, kind, entries_json, payload_hash, prev_hash, tx_hash, \
         hash_algorithm, committed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            tx_id,
            kind.as_str(),
            entries_json,
            payload_hash.value,
            prev_hash,
            tx_hash.value,
            hash_algorithm_label(DEFAULT_HASH_ALGORITHM),
            committed_at
        ],
    )
    .map_err(db_error)?;
    Ok(tx_id_u64)
}

// ============================================================================
// SECTION: Load & Check
// ============================================================================

/// Loads and integrity-checks transaction `tx_id`.
///
/// Returns `Ok(None)` when no such transaction exists.
///
/// # Errors
///
/// Returns [`SqliteLedgerError::Corrupt`] when any stored hash fails to
/// recompute or the link to the previous transaction is broken.
pub fn load_verified_tx(
    tx: &Transaction<'_>,
    tx_id: u64,
) -> Result<Option<LedgerTx>, SqliteLedgerError> {
    let id = i64::try_from(tx_id)
        .map_err(|_| SqliteLedgerError::Invalid(format!("tx id out of range: {tx_id}")))?;
    let Some(stored) = load_stored(tx, id)? else {
        return Ok(None);
    };
    let expected_prev = if id > 1 {
        let prev: Option<String> = tx
            .query_row("SELECT tx_hash FROM ledger_tx WHERE tx_id = ?1", params![id - 1], |row| {
                row.get(0)
            })
            .optional()
            .map_err(db_error)?;
        Some(prev.ok_or_else(|| {
            SqliteLedgerError::Corrupt(format!("missing tx {} before tx {id}", id - 1))
        })?)
    } else {
        None
    };
    check_stored(stored, expected_prev.as_deref()).map(Some)
}

/// Re-hashes the whole chain in order and returns the number of transactions.
///
/// # Errors
///
/// Returns [`SqliteLedgerError::Corrupt`] at the first broken link.
pub fn verify_chain(tx: &Transaction<'_>) -> Result<u64, SqliteLedgerError> {
    let mut statement = tx
        .prepare(
            "SELECT tx_id, kind, entries_json, payload_hash, prev_hash, tx_hash, hash_algorithm, \
             committed_at FROM ledger_tx ORDER BY tx_id ASC",
        )
        .map_err(db_error)?;
    let rows = statement.query_map([], stored_from_row).map_err(db_error)?;
    let mut previous: Option<String> = None;
    let mut count: u64 = 0;
    for row in rows {
        let stored = row.map_err(db_error)?;
        count = count.saturating_add(1);
        if u64::try_from(stored.tx_id).ok() != Some(count) {
            return Err(SqliteLedgerError::Corrupt(format!(
                "tx chain gap at tx {}",
                stored.tx_id
            )));
        }
        let checked = check_stored(stored, previous.as_deref())?;
        previous = Some(checked.tx_hash);
    }
    Ok(count)
}

/// Returns the id of the latest committed transaction.
///
/// # Errors
///
/// Returns [`SqliteLedgerError`] when the query fails.
pub fn current_tx_id(tx: &Transaction<'_>) -> Result<u64, SqliteLedgerError> {
    let id: Option<i64> =
        tx.query_row("SELECT MAX(tx_id) FROM ledger_tx", [], |row| row.get(0)).map_err(db_error)?;
    let id = id.unwrap_or(0);
    u64::try_from(id).map_err(|_| SqliteLedgerError::Corrupt(format!("negative tx id {id}")))
}

/// Loads a raw transaction row.
fn load_stored(tx: &Transaction<'_>, tx_id: i64) -> Result<Option<StoredTx>, SqliteLedgerError> {
    tx.query_row(
        "SELECT tx_id, kind, entries_json, payload_hash, prev_hash, tx_hash, hash_algorithm, \
         committed_at FROM ledger_tx WHERE tx_id = ?1",
        params![tx_id],
        stored_from_row,
    )
    .optional()
    .map_err(db_error)
}

/// Maps a `ledger_tx` row.
fn stored_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredTx> {
    Ok(StoredTx {
        tx_id: row.get(0)?,
        kind: row.get(1)?,
        entries_json: row.get(2)?,
        payload_hash: row.get(3)?,
        prev_hash: row.get(4)?,
        tx_hash: row.get(5)?,
        hash_algorithm: row.get(6)?,
        committed_at: row.get(7)?,
    })
}

/// Recomputes the hashes of a stored transaction and decodes its entries.
fn check_stored(
    stored: StoredTx,
    expected_prev: Option<&str>,
) -> Result<LedgerTx, SqliteLedgerError> {
    let algorithm = parse_hash_algorithm(&stored.hash_algorithm)?;
    let kind = TxKind::parse(&stored.kind)?;
    let tx_id = u64::try_from(stored.tx_id)
        .map_err(|_| SqliteLedgerError::Corrupt(format!("negative tx id {}", stored.tx_id)))?;
    if stored.prev_hash.as_deref() != expected_prev {
        return Err(SqliteLedgerError::Corrupt(format!("broken chain link at tx {tx_id}")));
    }
    let payload_hash = hash_bytes(algorithm, &stored.entries_json);
    if payload_hash.value != stored.payload_hash {
        return Err(SqliteLedgerError::Corrupt(format!("payload hash mismatch at tx {tx_id}")));
    }
    let link = ChainLink {
        tx_id,
        kind: kind.as_str(),
        payload_hash: &stored.payload_hash,
        prev_hash: stored.prev_hash.as_deref(),
        committed_at_ms: stored.committed_at,
    };
    let tx_hash = hash_chain_link(algorithm, &link)
        .map_err(|err| SqliteLedgerError::Invalid(err.to_string()))?;
    if tx_hash.value != stored.tx_hash {
        return Err(SqliteLedgerError::Corrupt(format!("tx hash mismatch at tx {tx_id}")));
    }
    let entries: Vec<TxEntry> = serde_json::from_slice(&stored.entries_json)
        .map_err(|err| SqliteLedgerError::Corrupt(format!("tx {tx_id} entries: {err}")))?;
    Ok(LedgerTx {
        tx_id,
        kind,
        entries,
        prev_hash: stored.prev_hash,
        tx_hash: stored.tx_hash,
    })
}

// ============================================================================
// SECTION: Hash Labels
// ============================================================================

/// Returns the canonical hash algorithm label.
#[must_use]
pub const fn hash_algorithm_label(algorithm: HashAlgorithm) -> &'static str {
    match algorithm {
        HashAlgorithm::Sha256 => "sha256",
    }
}

/// Parses a hash algorithm label.
///
/// # Errors
///
/// Returns [`SqliteLedgerError::Invalid`] for unsupported labels.
pub fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteLedgerError> {
    match label {
        "sha256" => Ok(HashAlgorithm::Sha256),
        other => Err(SqliteLedgerError::Invalid(format!("unsupported hash algorithm: {other}"))),
    }
}
