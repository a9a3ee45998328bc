//! Chain store
//!
//! Owns the accepted block sequence, the UTXO tracker, and the registry of
//! known public keys. `add_block` is the single writer; everything else reads
//! consistent snapshots and returns owned copies.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::consensus::{
    hash_meets_difficulty, validate_block_at, validate_block_transactions, Block, Outpoint, Utxo,
    ValidationError,
};
use crate::crypto::{Hash32, PublicAddress, PublicKey};
use crate::node::User;
use crate::storage::UtxoTracker;

/// Chain-level errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("block index out of range")]
    IndexOutOfRange,
    #[error("blockchain is empty")]
    Empty,
    #[error("previous hash mismatch")]
    PrevHashMismatch,
    #[error("hash does not meet difficulty requirements")]
    DifficultyNotMet,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// The blockchain: accepted blocks plus the derived UTXO set
#[derive(Debug, Default)]
pub struct Blockchain {
    blocks: RwLock<Vec<Block>>,
    utxo: UtxoTracker,
    registry: RwLock<HashMap<PublicAddress, PublicKey>>,
}

impl Blockchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the users' public keys resolvable during signature validation.
    pub fn register_users(&self, users: &[User]) {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        for user in users {
            registry.insert(user.public_address, user.public_key);
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.read().expect("chain lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn block_at(&self, index: usize) -> Result<Block, ChainError> {
        let blocks = self.blocks.read().expect("chain lock poisoned");
        blocks
            .get(index)
            .cloned()
            .ok_or(ChainError::IndexOutOfRange)
    }

    pub fn latest_block(&self) -> Result<Block, ChainError> {
        let blocks = self.blocks.read().expect("chain lock poisoned");
        blocks.last().cloned().ok_or(ChainError::Empty)
    }

    /// Hash of the current tip.
    pub fn tip_hash(&self) -> Result<Hash32, ChainError> {
        Ok(self.latest_block()?.header.hash())
    }

    /// Deep copy of the whole chain; callers may mutate it freely.
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().expect("chain lock poisoned").clone()
    }

    /// Iterate over a snapshot of the chain taken at call time.
    pub fn iter(&self) -> impl Iterator<Item = Block> {
        self.blocks().into_iter()
    }

    /// Append a block.
    ///
    /// Under the single writer lock: stateless validation, stateful
    /// validation against the live UTXO set, then a re-check of the tip link
    /// and difficulty (closing the race against a concurrent miner whose
    /// snapshot went stale), and finally the atomic append + UTXO scan.
    pub fn add_block(&self, block: Block) -> Result<(), ChainError> {
        let mut blocks = self.blocks.write().expect("chain lock poisoned");
        let is_genesis = blocks.is_empty();

        validate_block(&block, is_genesis)?;
        {
            let registry = self.registry.read().expect("registry lock poisoned");
            validate_block_transactions(&block, is_genesis, &self.utxo, &registry)?;
        }

        if let Some(tip) = blocks.last() {
            if block.header.prev_hash != tip.header.hash() {
                return Err(ChainError::PrevHashMismatch);
            }
            if !hash_meets_difficulty(&block.header.hash(), block.header.difficulty) {
                return Err(ChainError::DifficultyNotMet);
            }
        }

        self.utxo.scan_block(&block);
        blocks.push(block);
        Ok(())
    }

    /// Stateless validation of a candidate against the current height.
    pub fn validate_block(&self, block: &Block) -> Result<(), ValidationError> {
        validate_block(block, self.is_empty())
    }

    /// Stateful validation of a candidate against the current UTXO set.
    pub fn validate_block_transactions(&self, block: &Block) -> Result<(), ValidationError> {
        let registry = self.registry.read().expect("registry lock poisoned");
        validate_block_transactions(block, self.is_empty(), &self.utxo, &registry)
    }

    pub fn get_utxo(&self, outpoint: &Outpoint) -> Option<Utxo> {
        self.utxo.get(outpoint)
    }

    pub fn utxos_for_address(&self, address: &PublicAddress) -> Vec<Utxo> {
        self.utxo.utxos_for_address(address)
    }

    pub fn balance(&self, address: &PublicAddress) -> u32 {
        self.utxo.balance(address)
    }

    pub fn utxo_count(&self) -> usize {
        self.utxo.len()
    }

    /// Rebuild the UTXO set from scratch by replaying the chain.
    pub fn rescan_utxos(&self) {
        let blocks = self.blocks.read().expect("chain lock poisoned");
        self.utxo.scan_blockchain(&blocks);
    }
}

fn validate_block(block: &Block, is_genesis: bool) -> Result<(), ValidationError> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);
    validate_block_at(block, is_genesis, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{Body, Header, Transaction, TxOutput};
    use crate::crypto::generate_address;
    use crate::node::User;

    fn now_unix() -> u32 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32
    }

    fn genesis_for(user: &User, value: u32) -> Block {
        let tx = Transaction::new(
            vec![],
            vec![TxOutput {
                to: user.public_address,
                value,
            }],
        );
        let body = Body::new(vec![tx]);
        let merkle = body.merkle_root();
        Block::new(Header::new(1, now_unix(), Hash32::zero(), merkle, 0, 0), body)
    }

    fn test_user(seed: &str) -> User {
        User::from_mnemonic(1, seed.to_string(), seed).unwrap()
    }

    #[test]
    fn test_add_genesis_block() {
        let chain = Blockchain::new();
        let user = test_user("alice");
        let genesis = genesis_for(&user, 100);

        chain.add_block(genesis.clone()).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.latest_block().unwrap(), genesis);
        assert_eq!(chain.balance(&user.public_address), 100);
    }

    #[test]
    fn test_index_out_of_range() {
        let chain = Blockchain::new();
        assert_eq!(chain.block_at(0), Err(ChainError::IndexOutOfRange));
        assert_eq!(chain.latest_block(), Err(ChainError::Empty));
    }

    #[test]
    fn test_add_same_block_twice_fails() {
        let chain = Blockchain::new();
        let user = test_user("alice");
        let genesis = genesis_for(&user, 100);

        chain.add_block(genesis.clone()).unwrap();
        let err = chain.add_block(genesis).unwrap_err();
        assert_eq!(err, ChainError::PrevHashMismatch);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_stale_prev_hash_rejected() {
        let chain = Blockchain::new();
        let user = test_user("alice");
        chain.add_block(genesis_for(&user, 100)).unwrap();

        let miner = test_user("miner");
        let tx = Transaction::new(
            vec![],
            vec![TxOutput {
                to: generate_address(&miner.public_key.0),
                value: 10,
            }],
        );
        let body = Body::new(vec![tx]);
        let merkle = body.merkle_root();
        let block = Block::new(
            Header::new(1, now_unix(), Hash32::from_bytes([9u8; 32]), merkle, 0, 0),
            body,
        );

        assert_eq!(chain.add_block(block), Err(ChainError::PrevHashMismatch));
    }

    #[test]
    fn test_blocks_returns_deep_copy() {
        let chain = Blockchain::new();
        let user = test_user("alice");
        chain.add_block(genesis_for(&user, 100)).unwrap();

        let mut snapshot = chain.blocks();
        snapshot[0].header.nonce = 999;
        assert_ne!(chain.blocks()[0].header.nonce, 999);
    }

    #[test]
    fn test_rescan_reproduces_utxo_set() {
        let chain = Blockchain::new();
        let user = test_user("alice");
        chain.add_block(genesis_for(&user, 100)).unwrap();

        let before = chain.balance(&user.public_address);
        chain.rescan_utxos();
        assert_eq!(chain.balance(&user.public_address), before);
        assert_eq!(chain.utxo_count(), 1);
    }
}
