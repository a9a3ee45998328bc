//! Genesis bootstrap
//!
//! The genesis block funds every user with one coinbase transaction whose
//! outputs split the amount into ascending power-of-two denominations, then
//! is mined through the normal nonce search and accepted through the normal
//! `add_block` path.

use rand::Rng;
use tracing::info;

use crate::consensus::{Body, Header, Transaction, TxOutput};
use crate::crypto::Hash32;
use crate::mining::{find_valid_nonce, CancelToken, MiningError};
use crate::storage::Blockchain;

use super::User;

/// One funding coinbase per user, outputs in power-of-two denominations
/// (1, 2, 4, ... plus the remainder) so early spends have change material.
pub fn generate_fund_transactions(users: &[User], low: u32, high: u32) -> Vec<Transaction> {
    let mut rng = rand::thread_rng();
    let mut txs = Vec::with_capacity(users.len());

    for user in users {
        let amount = if high <= low {
            low
        } else {
            rng.gen_range(low..=high)
        };

        let mut denominations = Vec::new();
        let mut remaining = amount;
        let mut size: u32 = 1;
        while remaining > 0 {
            if remaining >= size {
                denominations.push(size);
                remaining -= size;
                size = size.saturating_mul(2);
            } else {
                denominations.push(remaining);
                remaining = 0;
            }
        }
        denominations.sort_unstable();

        let outputs = denominations
            .into_iter()
            .map(|value| TxOutput {
                to: user.public_address,
                value,
            })
            .collect();

        txs.push(Transaction::new(vec![], outputs));
    }

    txs
}

/// Assemble and mine the genesis block over the given funding transactions.
pub fn create_genesis_block(
    cancel: &CancelToken,
    txs: Vec<Transaction>,
    version: u32,
    difficulty: u32,
) -> Result<crate::consensus::Block, MiningError> {
    let body = Body::new(txs);
    let mut header = Header::new(
        version,
        now_unix(),
        Hash32::zero(),
        body.merkle_root(),
        difficulty,
        0,
    );
    let (nonce, hash) = find_valid_nonce(cancel, &header)?;
    header.nonce = nonce;
    info!(nonce, hash = %hash, "mined genesis block");

    Ok(crate::consensus::Block::new(header, body))
}

/// Create a chain whose genesis funds every user with a value in
/// `[low, high]`.
pub fn init_blockchain_with_funds(
    cancel: &CancelToken,
    users: &[User],
    low: u32,
    high: u32,
    version: u32,
    difficulty: u32,
) -> Result<Blockchain, MiningError> {
    let txs = generate_fund_transactions(users, low, high);
    let genesis = create_genesis_block(cancel, txs, version, difficulty)?;

    let chain = Blockchain::new();
    chain.add_block(genesis)?;
    Ok(chain)
}

fn now_unix() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
