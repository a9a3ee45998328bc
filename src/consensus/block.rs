//! Block and header structures
//!
//! The header serializes to exactly 80 bytes; its single-pass Archas digest
//! is the block hash.

use serde::{Deserialize, Serialize};

use crate::crypto::{archas, merkle_root, Hash32};

use super::Transaction;

/// Block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub timestamp: u32,
    pub prev_hash: Hash32,
    pub merkle_root: Hash32,
    pub difficulty: u32,
    pub nonce: u32,
}

impl Header {
    pub fn new(
        version: u32,
        timestamp: u32,
        prev_hash: Hash32,
        merkle_root: Hash32,
        difficulty: u32,
        nonce: u32,
    ) -> Self {
        Self {
            version,
            timestamp,
            prev_hash,
            merkle_root,
            difficulty,
            nonce,
        }
    }

    /// 80-byte wire form: version, prev_hash, merkle_root, timestamp,
    /// difficulty, nonce. Integers little-endian, hashes natural order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(80);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.prev_hash.0);
        buf.extend_from_slice(&self.merkle_root.0);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.difficulty.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf
    }

    /// Block hash: a single Archas pass over the serialized header.
    pub fn hash(&self) -> Hash32 {
        archas(&self.serialize())
    }
}

/// Ordered transactions of a block; the order defines the Merkle leaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub transactions: Vec<Transaction>,
}

impl Body {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Merkle root over Archas digests of the fully serialized transactions.
    pub fn merkle_root(&self) -> Hash32 {
        let leaves: Vec<Hash32> = self
            .transactions
            .iter()
            .map(|tx| archas(&tx.serialize()))
            .collect();
        merkle_root(&leaves)
    }
}

/// A complete block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub body: Body,
}

impl Block {
    pub fn new(header: Header, body: Body) -> Self {
        Self { header, body }
    }

    pub fn hash(&self) -> Hash32 {
        self.header.hash()
    }

    /// Genesis blocks are the only ones linking to the zero hash.
    pub fn is_genesis(&self) -> bool {
        self.header.prev_hash.is_zero()
    }
}
