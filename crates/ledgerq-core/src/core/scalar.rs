// crates/ledgerq-core/src/core/scalar.rs
// ============================================================================
// Module: Typed Scalars
// Description: Tagged, nullable scalar values carried by canonical rows.
// Purpose: Give every result cell exactly one explicit representation.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`TypedScalar`] is the value half of a canonical row cell. Null is its own
//! variant and is never encoded as an empty or zero value of another variant.
//! [`ScalarKind`] holds the fixed mapping from database-reported column type
//! names to the scalar kind a cursor must decode into.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Scalar Kind
// ============================================================================

/// Target kind for decoding a result column.
///
/// # Invariants
/// - Variants map 1:1 to the non-null [`TypedScalar`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    /// UTF-8 string.
    String,
    /// 64-bit signed integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Raw byte sequence.
    Bytes,
    /// Timestamp in microseconds since the Unix epoch.
    Timestamp,
}

impl ScalarKind {
    /// Maps a database-reported column type name to a scalar kind.
    ///
    /// `VARCHAR`, `ANY`, and every unrecognized name decode as strings. The
    /// string fallback is the permissive default: an unknown column type is
    /// still readable, it is just not interpreted. Size suffixes
    /// (`VARCHAR[64]`, `VARCHAR(64)`) and trailing modifiers
    /// (`INTEGER AUTO_INCREMENT`) are ignored and matching is case-insensitive.
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        let base = type_name
            .trim()
            .split(|ch: char| ch == '[' || ch == '(' || ch.is_whitespace())
            .next()
            .unwrap_or_default();
        match base.to_ascii_uppercase().as_str() {
            "INTEGER" => Self::Integer,
            "BOOLEAN" => Self::Boolean,
            "BLOB" => Self::Bytes,
            "TIMESTAMP" => Self::Timestamp,
            _ => Self::String,
        }
    }

    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
        }
    }
}

// ============================================================================
// SECTION: Typed Scalar
// ============================================================================

/// Nullable, type-tagged scalar value.
///
/// # Invariants
/// - Exactly one variant is populated; [`TypedScalar::Null`] is the only null form.
/// - Timestamps are microseconds since the Unix epoch (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypedScalar {
    /// UTF-8 string value.
    String(String),
    /// 64-bit signed integer value.
    Integer(i64),
    /// Boolean value.
    Boolean(bool),
    /// Byte sequence value.
    Bytes(Vec<u8>),
    /// Timestamp value in microseconds since the Unix epoch.
    Timestamp(i64),
    /// Explicit null.
    Null,
}

impl TypedScalar {
    /// Returns the kind of a non-null value, or `None` for null.
    #[must_use]
    pub const fn kind(&self) -> Option<ScalarKind> {
        match self {
            Self::String(_) => Some(ScalarKind::String),
            Self::Integer(_) => Some(ScalarKind::Integer),
            Self::Boolean(_) => Some(ScalarKind::Boolean),
            Self::Bytes(_) => Some(ScalarKind::Bytes),
            Self::Timestamp(_) => Some(ScalarKind::Timestamp),
            Self::Null => None,
        }
    }

    /// Returns true for the explicit null variant.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string value when present.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the integer value when present.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the boolean value when present.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the byte value when present.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i64> for TypedScalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for TypedScalar {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for TypedScalar {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for TypedScalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for TypedScalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TypedScalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for TypedScalar {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for TypedScalar {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<T: Into<Self>> From<Option<T>> for TypedScalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// ============================================================================
// SECTION: Timestamp Parsing
// ============================================================================

/// Parses an RFC 3339 timestamp into microseconds since the Unix epoch.
#[must_use]
pub fn timestamp_micros_from_rfc3339(text: &str) -> Option<i64> {
    let parsed = OffsetDateTime::parse(text.trim(), &Rfc3339).ok()?;
    i64::try_from(parsed.unix_timestamp_nanos() / 1_000).ok()
}
