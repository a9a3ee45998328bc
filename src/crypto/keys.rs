//! secp256k1 ECDSA key pairs and transaction signing
//!
//! Signatures are produced over a precomputed 32-byte digest (never re-hashed
//! by the signer) and serialized as DER. Malformed keys or signatures fail
//! verification with a typed error or a clean `false`, never a panic.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::Hash32;

/// Key and signature errors
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("signing failed")]
    SigningFailed,
}

/// 32-byte secp256k1 private key
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

/// 33-byte compressed secp256k1 public key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 33]);

impl PrivateKey {
    /// Derive a private key from a mnemonic-like seed string.
    ///
    /// The seed is trimmed, lowercased, and hashed with SHA-256 to produce
    /// the 32 key bytes, so equal seeds always yield equal keys.
    pub fn from_mnemonic(mnemonic: &str) -> Result<Self, KeyError> {
        let cleaned = mnemonic.trim().to_lowercase();
        let digest = Sha256::digest(cleaned.as_bytes());
        Self::from_bytes(&digest.into())
    }

    /// Create from 32 raw bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        SigningKey::from_slice(bytes)
            .map(PrivateKey)
            .map_err(|_| KeyError::InvalidPrivateKey)
    }

    /// The corresponding compressed public key
    pub fn public_key(&self) -> PublicKey {
        let point = self.0.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        PublicKey(bytes)
    }

    /// Sign a 32-byte digest, returning the DER-encoded signature.
    pub fn sign(&self, digest: &Hash32) -> Result<Vec<u8>, KeyError> {
        let signature: Signature = self
            .0
            .sign_prehash(&digest.0)
            .map_err(|_| KeyError::SigningFailed)?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    /// Export to bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }
}

impl PublicKey {
    /// Create from a 33-byte compressed encoding, validating the point.
    pub fn from_bytes(bytes: &[u8; 33]) -> Result<Self, KeyError> {
        VerifyingKey::from_sec1_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(PublicKey(*bytes))
    }

    /// Parse from a 66-character hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidPublicKey)?;
        if bytes.len() != 33 {
            return Err(KeyError::InvalidPublicKey);
        }
        let mut arr = [0u8; 33];
        arr.copy_from_slice(&bytes);
        Self::from_bytes(&arr)
    }

    /// Decode into a point on the curve.
    pub fn verifying_key(&self) -> Result<VerifyingKey, KeyError> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| KeyError::InvalidPublicKey)
    }

    /// Verify a DER-encoded signature over a 32-byte digest.
    ///
    /// Returns `false` for malformed DER or a key that fails to parse.
    pub fn verify(&self, digest: &Hash32, der_signature: &[u8]) -> bool {
        let verifying_key = match self.verifying_key() {
            Ok(vk) => vk,
            Err(_) => return false,
        };
        let signature = match Signature::from_der(der_signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        verifying_key.verify_prehash(&digest.0, &signature).is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
