//! Baseline hashing
//!
//! Provides [`BaselineHash`], the SHA-256 digest of a project snapshot used as
//! an optimistic-concurrency token between load and apply.

use sha2::{Digest, Sha256};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Length of the digest in bytes
pub const BASELINE_HASH_LEN: usize = 32;

/// A 32-byte SHA-256 digest rendered as 64 lowercase hex characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BaselineHash([u8; BASELINE_HASH_LEN]);

impl BaselineHash {
    /// Create a new BaselineHash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; BASELINE_HASH_LEN]) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BASELINE_HASH_LEN] {
        &self.0
    }

    /// Create hash from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; BASELINE_HASH_LEN] =
            bytes.try_into().map_err(|_| HashError::InvalidLength {
                expected: BASELINE_HASH_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// SHA-256 of arbitrary bytes
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// SHA-256 of the JSON encoding of `value`
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn compute_serializable<T>(value: &T) -> Result<Self, HashError>
    where
        T: serde::Serialize,
    {
        let json = serde_json::to_vec(value)?;
        Ok(Self::compute(&json))
    }

    /// First `len` hex characters (capped at 64)
    #[must_use]
    pub fn prefix(&self, len: usize) -> String {
        let mut full = hex::encode(self.0);
        full.truncate(len);
        full
    }

    /// True when `candidate` is a well-formed 64-hex-character digest
    #[must_use]
    pub fn is_well_formed(candidate: &str) -> bool {
        candidate.len() == BASELINE_HASH_LEN * 2
            && candidate.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Display for BaselineHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for BaselineHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for BaselineHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for BaselineHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct BaselineHashVisitor;

        impl serde::de::Visitor<'_> for BaselineHashVisitor {
            type Value = BaselineHash;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a 64-character hex SHA-256 digest")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(BaselineHashVisitor)
    }
}

/// Errors that can occur when working with baseline hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
