//! UTXO tracker
//!
//! In-memory map of unspent transaction outputs behind a reader/writer lock.
//! Writes happen only through block scans; readers get value copies.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::consensus::{Block, Outpoint, Utxo};
use crate::crypto::PublicAddress;

/// Set of all unspent transaction outputs
#[derive(Debug, Default)]
pub struct UtxoTracker {
    set: RwLock<HashMap<Outpoint, Utxo>>,
}

impl UtxoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one block: inputs are consumed first, then each output becomes
    /// a fresh UTXO at `(tx_id, output_index)`. Transaction order within the
    /// block is respected, so a later transaction may consume an output
    /// produced by an earlier one.
    pub fn scan_block(&self, block: &Block) {
        let mut set = self.set.write().expect("utxo lock poisoned");

        for tx in &block.body.transactions {
            for input in &tx.inputs {
                set.remove(&input.prev);
            }

            for (idx, output) in tx.outputs.iter().enumerate() {
                let outpoint = Outpoint {
                    tx_id: tx.tx_id,
                    index: idx as u32,
                };
                set.insert(
                    outpoint,
                    Utxo {
                        outpoint,
                        to: output.to,
                        value: output.value,
                    },
                );
            }
        }
    }

    /// Recovery path: reset and replay the whole chain front to back.
    /// Steady-state callers should rely on the incremental `scan_block`.
    pub fn scan_blockchain(&self, blocks: &[Block]) {
        {
            let mut set = self.set.write().expect("utxo lock poisoned");
            set.clear();
        }
        for block in blocks {
            self.scan_block(block);
        }
    }

    pub fn get(&self, outpoint: &Outpoint) -> Option<Utxo> {
        let set = self.set.read().expect("utxo lock poisoned");
        set.get(outpoint).copied()
    }

    pub fn contains(&self, outpoint: &Outpoint) -> bool {
        let set = self.set.read().expect("utxo lock poisoned");
        set.contains_key(outpoint)
    }

    pub fn utxos_for_address(&self, address: &PublicAddress) -> Vec<Utxo> {
        let set = self.set.read().expect("utxo lock poisoned");
        set.values()
            .filter(|utxo| utxo.to == *address)
            .copied()
            .collect()
    }

    /// Total value held by an address, clamped at `u32::MAX` on overflow.
    pub fn balance(&self, address: &PublicAddress) -> u32 {
        self.utxos_for_address(address)
            .iter()
            .fold(0u32, |acc, utxo| acc.saturating_add(utxo.value))
    }

    pub fn len(&self) -> usize {
        let set = self.set.read().expect("utxo lock poisoned");
        set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the full set, for audits and tests.
    pub fn snapshot(&self) -> HashMap<Outpoint, Utxo> {
        let set = self.set.read().expect("utxo lock poisoned");
        set.clone()
    }
}
