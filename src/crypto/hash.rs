//! 32-byte hash value type
//!
//! Hashes serialize to the wire in natural byte order, but display and JSON
//! follow the usual blockchain convention of byte-reversed hex.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 32-byte hash output
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// Create a zero hash (used for the genesis previous hash)
    pub const fn zero() -> Self {
        Hash32([0u8; 32])
    }

    /// Create hash from bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash32(bytes)
    }

    /// Parse from a byte-reversed (display order) hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        for (i, b) in bytes.iter().enumerate() {
            arr[31 - i] = *b;
        }
        Ok(Hash32(arr))
    }

    /// Byte-reversed (display order) hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.reversed().0)
    }

    /// Natural-order hex string, matching the wire serialization
    pub fn to_hex_natural(&self) -> String {
        hex::encode(self.0)
    }

    /// A copy with the byte order reversed
    pub fn reversed(&self) -> Self {
        let mut out = [0u8; 32];
        for i in 0..32 {
            out[i] = self.0[31 - i];
        }
        Hash32(out)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash32::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
