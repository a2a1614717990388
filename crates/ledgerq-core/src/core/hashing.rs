// crates/ledgerq-core/src/core/hashing.rs
// ============================================================================
// Module: Ledger Hashing
// Description: RFC 8785 canonical JSON hashing for row versions and tx chains.
// Purpose: Provide the deterministic digests the ledger verifies rows against.
// Dependencies: crate::core::scalar, serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Row versions are hashed over the RFC 8785 (JCS) canonical JSON of a
//! [`RowSnapshot`]: table name, primary key, and a column-name-ordered map of
//! typed values. Transactions are chained: each transaction hash covers the
//! previous transaction hash and the digest of its own entries.
//!
//! Security posture: these digests are the tamper evidence; any change to the
//! snapshot shape changes every stored hash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::scalar::TypedScalar;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported hash algorithms for ledger digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

/// Default hash algorithm for row and transaction digests.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Content hash with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON using the provided algorithm.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes using the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let digest = Sha256::digest(bytes);
            HashDigest::new(HashAlgorithm::Sha256, &digest)
        }
    }
}

// ============================================================================
// SECTION: Row Snapshots
// ============================================================================

/// Hashed form of one stored row version.
///
/// # Invariants
/// - `columns` is keyed by bare column name, so ordering is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSnapshot<'a> {
    /// Table name.
    pub table: &'a str,
    /// Primary-key value.
    pub primary_key: &'a TypedScalar,
    /// Column values by column name.
    pub columns: &'a BTreeMap<String, TypedScalar>,
}

/// Hashes a row snapshot.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_row_snapshot(
    algorithm: HashAlgorithm,
    snapshot: &RowSnapshot<'_>,
) -> Result<HashDigest, HashError> {
    hash_canonical_json(algorithm, snapshot)
}

// ============================================================================
// SECTION: Transaction Chain
// ============================================================================

/// Hashed link of the transaction chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainLink<'a> {
    /// Transaction identifier.
    pub tx_id: u64,
    /// Transaction kind label.
    pub kind: &'a str,
    /// Digest of the transaction entries.
    pub payload_hash: &'a str,
    /// Hash of the previous transaction, absent for genesis.
    pub prev_hash: Option<&'a str>,
    /// Commit timestamp (milliseconds since epoch).
    pub committed_at_ms: i64,
}

/// Hashes one link of the transaction chain.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_chain_link(
    algorithm: HashAlgorithm,
    link: &ChainLink<'_>,
) -> Result<HashDigest, HashError> {
    hash_canonical_json(algorithm, link)
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
