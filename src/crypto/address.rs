//! HASH160 public addresses
//!
//! An address is `RIPEMD160(SHA256(pubkey))` over the 33-byte compressed
//! public key. These use the standard hashes, not Archas.

use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Address parsing errors
#[derive(Debug, Error, PartialEq)]
pub enum AddressParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("public address must be 20 bytes")]
    InvalidLength,
}

/// 20-byte HASH160 address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicAddress(pub [u8; 20]);

impl PublicAddress {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        PublicAddress(bytes)
    }

    /// Parse from a 40-character hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, AddressParseError> {
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != 20 {
            return Err(AddressParseError::InvalidLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(PublicAddress(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicAddress({})", self.to_hex())
    }
}

impl fmt::Display for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for PublicAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicAddress::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Derive the 20-byte HASH160 address of a public key.
pub fn generate_address(public_key: &[u8]) -> PublicAddress {
    let sha = Sha256::digest(public_key);
    let ripe = Ripemd160::digest(sha);

    let mut address = [0u8; 20];
    address.copy_from_slice(&ripe);
    PublicAddress(address)
}
