//! Random transaction generation
//!
//! Samples value transfers between users against the live UTXO set. A
//! generator-wide mutex serializes the read-modify-write over the snapshot so
//! one batch never hands the same outpoint to two transactions.

use std::collections::HashSet;
use std::sync::Mutex;

use rand::Rng;

use crate::consensus::{Outpoint, Transaction, TxInput, TxOutput, Utxo};
use crate::node::User;
use crate::storage::Blockchain;

use super::{CancelToken, MiningError};

#[derive(Debug, Default)]
pub struct TxGenerator {
    gate: Mutex<()>,
}

impl TxGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate up to `count` signed transactions with values drawn from
    /// `[low, high]`.
    ///
    /// Runs at most `count * 10` attempts; attempts that land on a sender
    /// with no spendable UTXOs (or not enough of them) are simply skipped.
    /// Fails with `InsufficientFunds` only when nothing at all could be
    /// produced.
    pub fn generate(
        &self,
        chain: &Blockchain,
        users: &[User],
        low: u32,
        high: u32,
        count: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Transaction>, MiningError> {
        if high < low {
            return Err(MiningError::InvalidAmountRange);
        }
        if users.len() < 2 || count == 0 {
            return Err(MiningError::InsufficientFunds);
        }

        let _gate = self.gate.lock().expect("tx generator lock poisoned");
        let mut rng = rand::thread_rng();
        let mut used: HashSet<Outpoint> = HashSet::new();
        let mut txs: Vec<Transaction> = Vec::new();

        for _ in 0..count * 10 {
            if txs.len() >= count {
                break;
            }
            if cancel.is_canceled() {
                return Err(MiningError::Canceled);
            }

            let sender_idx = rng.gen_range(0..users.len());
            let mut recipient_idx = rng.gen_range(0..users.len());
            while recipient_idx == sender_idx {
                recipient_idx = rng.gen_range(0..users.len());
            }
            let sender = &users[sender_idx];
            let recipient = &users[recipient_idx];

            let mut utxos = chain.utxos_for_address(&sender.public_address);
            utxos.retain(|u| !used.contains(&u.outpoint));
            if utxos.is_empty() {
                continue;
            }

            let amount = rng.gen_range(low..=high);

            let mut selected: Vec<Utxo> = Vec::new();
            let mut total: u64 = 0;
            for utxo in utxos {
                selected.push(utxo);
                total += utxo.value as u64;
                if total >= amount as u64 {
                    break;
                }
            }
            if total < amount as u64 {
                continue;
            }

            let mut outputs = vec![TxOutput {
                to: recipient.public_address,
                value: amount,
            }];
            let change = total - amount as u64;
            if change > 0 {
                outputs.push(TxOutput {
                    to: sender.public_address,
                    value: change as u32,
                });
            }

            let inputs: Vec<TxInput> = selected
                .iter()
                .map(|utxo| TxInput {
                    prev: utxo.outpoint,
                    sig: Vec::new(),
                })
                .collect();

            let mut tx = Transaction::new(inputs, outputs);
            for (i, utxo) in selected.iter().enumerate() {
                let digest = tx.signature_hash(utxo.value, &utxo.to);
                tx.inputs[i].sig = sender.private_key.sign(&digest)?;
            }

            for utxo in &selected {
                used.insert(utxo.outpoint);
            }
            txs.push(tx);
        }

        if txs.is_empty() {
            return Err(MiningError::InsufficientFunds);
        }
        Ok(txs)
    }
}
