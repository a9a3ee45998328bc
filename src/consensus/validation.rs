//! Block and transaction validation
//!
//! Split into a stateless phase (header and structural checks against the
//! block alone) and a stateful phase (inputs resolved against the live UTXO
//! set and the address registry).

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::constants::{MAX_COINBASE_REWARD, TIMESTAMP_WINDOW_SECS};
use crate::crypto::{generate_address, PublicAddress, PublicKey};
use crate::storage::UtxoTracker;

use super::{hash_meets_difficulty, Block, Outpoint};

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block has no transactions")]
    EmptyBody,
    #[error("merkle root mismatch")]
    MerkleRootMismatch,
    #[error("block timestamp too far in future")]
    TimestampTooFarInFuture,
    #[error("block timestamp too far in past")]
    TimestampTooFarInPast,
    #[error("hash does not meet difficulty requirements")]
    PowInsufficient,
    #[error("transaction id mismatch at index {0}")]
    TxIdMismatch(usize),
    #[error("genesis transaction {0} must be coinbase")]
    GenesisNonCoinbase(usize),
    #[error("coinbase transaction only allowed as first transaction (found at index {0})")]
    CoinbaseMisplaced(usize),
    #[error("transaction has no outputs")]
    EmptyOutputs,
    #[error("missing signature for non-coinbase input")]
    MissingSignature,
    #[error("no known public key for spent address")]
    UnknownPublicKey,
    #[error("public key does not hash to the spent address")]
    AddressMismatch,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("utxo not found")]
    UtxoNotFound,
    #[error("double spend detected")]
    DoubleSpend,
    #[error("zero-value output not allowed")]
    ZeroValueOutput,
    #[error("coinbase reward exceeds maximum")]
    CoinbaseRewardTooLarge,
    #[error("input sum overflow")]
    InputSumOverflow,
    #[error("output sum overflow")]
    OutputSumOverflow,
    #[error("outputs exceed inputs")]
    OutputsExceedInputs,
}

fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Stateless block validation against the system clock.
pub fn validate_block(block: &Block, is_genesis: bool) -> Result<(), ValidationError> {
    validate_block_at(block, is_genesis, now_unix())
}

/// Stateless block validation against an explicit clock reading.
pub fn validate_block_at(block: &Block, is_genesis: bool, now: u32) -> Result<(), ValidationError> {
    let txs = &block.body.transactions;
    if txs.is_empty() {
        return Err(ValidationError::EmptyBody);
    }

    if block.body.merkle_root() != block.header.merkle_root {
        return Err(ValidationError::MerkleRootMismatch);
    }

    if !is_genesis && !hash_meets_difficulty(&block.header.hash(), block.header.difficulty) {
        return Err(ValidationError::PowInsufficient);
    }

    // The future bound applies to every block; the past bound (a replay
    // guard) is relaxed for genesis.
    if block.header.timestamp > now.saturating_add(TIMESTAMP_WINDOW_SECS) {
        return Err(ValidationError::TimestampTooFarInFuture);
    }
    if !is_genesis && block.header.timestamp < now.saturating_sub(TIMESTAMP_WINDOW_SECS) {
        return Err(ValidationError::TimestampTooFarInPast);
    }

    for (i, tx) in txs.iter().enumerate() {
        if tx.tx_id != tx.compute_tx_id() {
            return Err(ValidationError::TxIdMismatch(i));
        }

        let is_coinbase = tx.is_coinbase();
        if is_genesis {
            if !is_coinbase {
                return Err(ValidationError::GenesisNonCoinbase(i));
            }
            continue;
        }
        if is_coinbase && i != 0 {
            return Err(ValidationError::CoinbaseMisplaced(i));
        }
    }

    Ok(())
}

/// Stateful transaction validation against the current UTXO set and the
/// registry of known public keys.
///
/// A transaction may spend an output produced earlier in the same block;
/// those are resolved through a block-local scratch map before falling back
/// to the UTXO set.
pub fn validate_block_transactions(
    block: &Block,
    is_genesis: bool,
    utxo: &UtxoTracker,
    registry: &HashMap<PublicAddress, PublicKey>,
) -> Result<(), ValidationError> {
    let txs = &block.body.transactions;
    if txs.is_empty() {
        return Err(ValidationError::EmptyBody);
    }

    let mut spent_in_block: HashSet<Outpoint> = HashSet::new();
    let mut created_in_block: HashMap<Outpoint, (PublicAddress, u32)> = HashMap::new();

    for (i, tx) in txs.iter().enumerate() {
        let is_coinbase = tx.is_coinbase();

        if is_genesis && !is_coinbase {
            return Err(ValidationError::GenesisNonCoinbase(i));
        }

        if is_coinbase {
            if !is_genesis && i != 0 {
                return Err(ValidationError::CoinbaseMisplaced(i));
            }
            if tx.outputs.is_empty() {
                return Err(ValidationError::EmptyOutputs);
            }
            let mut total: u32 = 0;
            for output in &tx.outputs {
                if output.value == 0 {
                    return Err(ValidationError::ZeroValueOutput);
                }
                total = total
                    .checked_add(output.value)
                    .ok_or(ValidationError::OutputSumOverflow)?;
            }
            // Genesis funding transactions are exempt from the reward cap.
            if !is_genesis && total > MAX_COINBASE_REWARD {
                return Err(ValidationError::CoinbaseRewardTooLarge);
            }
            record_outputs(tx, &mut created_in_block);
            continue;
        }

        if tx.outputs.is_empty() {
            return Err(ValidationError::EmptyOutputs);
        }

        let mut input_sum: u32 = 0;
        for input in &tx.inputs {
            if spent_in_block.contains(&input.prev) {
                return Err(ValidationError::DoubleSpend);
            }

            let (spent_to, spent_value) = match created_in_block.get(&input.prev) {
                Some(entry) => *entry,
                None => {
                    let utxo_entry = utxo.get(&input.prev).ok_or(ValidationError::UtxoNotFound)?;
                    (utxo_entry.to, utxo_entry.value)
                }
            };

            input_sum = input_sum
                .checked_add(spent_value)
                .ok_or(ValidationError::InputSumOverflow)?;

            if input.sig.is_empty() {
                return Err(ValidationError::MissingSignature);
            }

            let public_key = registry
                .get(&spent_to)
                .ok_or(ValidationError::UnknownPublicKey)?;
            if generate_address(&public_key.0) != spent_to {
                return Err(ValidationError::AddressMismatch);
            }

            let digest = tx.signature_hash(spent_value, &spent_to);
            if !public_key.verify(&digest, &input.sig) {
                return Err(ValidationError::InvalidSignature);
            }

            spent_in_block.insert(input.prev);
        }

        let mut output_sum: u32 = 0;
        for output in &tx.outputs {
            if output.value == 0 {
                return Err(ValidationError::ZeroValueOutput);
            }
            output_sum = output_sum
                .checked_add(output.value)
                .ok_or(ValidationError::OutputSumOverflow)?;
        }

        // The shortfall, if any, is an implicit fee; it is accepted but
        // credited nowhere.
        if input_sum < output_sum {
            return Err(ValidationError::OutputsExceedInputs);
        }

        record_outputs(tx, &mut created_in_block);
    }

    Ok(())
}

fn record_outputs(
    tx: &super::Transaction,
    created_in_block: &mut HashMap<Outpoint, (PublicAddress, u32)>,
) {
    for (idx, output) in tx.outputs.iter().enumerate() {
        let outpoint = Outpoint {
            tx_id: tx.tx_id,
            index: idx as u32,
        };
        created_in_block.insert(outpoint, (output.to, output.value));
    }
}
