//! Worker-pool mining
//!
//! Each round races one worker per CPU toward the next block. Workers build
//! independent candidate bodies and nonce-search them; the first block that
//! the chain store accepts wins the round, and the capacity-1 channel plus
//! round-scoped cancel token shut the rest down.

use std::sync::mpsc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::consensus::{Block, Body, Header};
use crate::node::User;
use crate::storage::Blockchain;

use super::{find_valid_nonce, CancelToken, MiningError, TxGenerator};

/// Parameters of a worker-pool mining run
#[derive(Debug, Clone)]
pub struct MineOptions {
    pub block_count: usize,
    pub tx_count: usize,
    pub low: u32,
    pub high: u32,
    pub version: u32,
    pub difficulty: u32,
}

pub(crate) fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Assemble and mine a block on top of the current tip, with an explicit
/// header timestamp.
///
/// The tip is read from a snapshot; a concurrent miner may advance it before
/// the result reaches `add_block`, which re-checks under its writer lock.
pub fn generate_block_with_timestamp(
    chain: &Blockchain,
    cancel: &CancelToken,
    body: Body,
    version: u32,
    difficulty: u32,
    timestamp: u32,
) -> Result<Block, MiningError> {
    let prev_hash = chain.latest_block()?.header.hash();

    let mut header = Header::new(
        version,
        timestamp,
        prev_hash,
        body.merkle_root(),
        difficulty,
        0,
    );
    let (nonce, _) = find_valid_nonce(cancel, &header)?;
    header.nonce = nonce;

    Ok(Block::new(header, body))
}

/// `generate_block_with_timestamp` stamped with the current time.
pub fn generate_block(
    chain: &Blockchain,
    cancel: &CancelToken,
    body: Body,
    version: u32,
    difficulty: u32,
) -> Result<Block, MiningError> {
    generate_block_with_timestamp(chain, cancel, body, version, difficulty, now_unix())
}

/// Mine `block_count` blocks, racing one worker per CPU each round.
pub fn mine_blocks(
    chain: &Blockchain,
    users: &[User],
    txgen: &TxGenerator,
    opts: &MineOptions,
    parent: &CancelToken,
) -> Result<(), MiningError> {
    if opts.block_count == 0 {
        return Ok(());
    }

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    for round_index in 0..opts.block_count {
        if parent.is_canceled() {
            return Err(MiningError::Canceled);
        }

        let round = parent.child();
        let (result_tx, result_rx) = mpsc::sync_channel::<Block>(1);
        let base_ts = now_unix();

        thread::scope(|scope| {
            for worker_id in 0..workers {
                let round = round.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    mine_round_worker(
                        chain, users, txgen, opts, &round, result_tx,
                        // Distinct timestamps give every worker an
                        // independent nonce search.
                        base_ts + worker_id as u32,
                        worker_id,
                    );
                });
            }
            drop(result_tx);

            // First accepted block wins the round; everything else is
            // cancelled and joined by the scope exit.
            if let Ok(block) = result_rx.recv() {
                round.cancel();
                info!(
                    round = round_index,
                    height = chain.len() - 1,
                    txs = block.body.transactions.len(),
                    nonce = block.header.nonce,
                    hash = %block.hash(),
                    "mined block"
                );
            } else {
                round.cancel();
            }
        });

        if parent.is_canceled() {
            return Err(MiningError::Canceled);
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn mine_round_worker(
    chain: &Blockchain,
    users: &[User],
    txgen: &TxGenerator,
    opts: &MineOptions,
    round: &CancelToken,
    result_tx: mpsc::SyncSender<Block>,
    timestamp: u32,
    worker_id: usize,
) {
    loop {
        if round.is_canceled() {
            return;
        }

        let txs = match txgen.generate(chain, users, opts.low, opts.high, opts.tx_count, round) {
            Ok(txs) => txs,
            Err(MiningError::Canceled) => return,
            Err(err) => {
                debug!(worker_id, %err, "transaction generation failed, retrying");
                continue;
            }
        };

        let body = Body::new(txs);
        let block = match generate_block_with_timestamp(
            chain,
            round,
            body,
            opts.version,
            opts.difficulty,
            timestamp,
        ) {
            Ok(block) => block,
            Err(MiningError::Canceled) => return,
            Err(err) => {
                debug!(worker_id, %err, "block generation failed, retrying");
                continue;
            }
        };

        match chain.add_block(block.clone()) {
            Ok(()) => {
                // Cancel siblings before publishing so the round cannot
                // accept a second block.
                round.cancel();
                let _ = result_tx.try_send(block);
                return;
            }
            Err(err) => {
                // Typically a stale tip after someone else won the round.
                debug!(worker_id, %err, "append rejected, retrying");
                continue;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{Transaction, TxOutput};
    use crate::crypto::Hash32;
    use crate::node::{generate_fund_transactions, User};

    fn test_users() -> Vec<User> {
        ["alice", "bob", "charlie", "dave"]
            .iter()
            .enumerate()
            .map(|(i, name)| User::from_mnemonic(i as u32 + 1, name.to_string(), name).unwrap())
            .collect()
    }

    fn funded_chain(users: &[User]) -> Blockchain {
        let txs = generate_fund_transactions(users, 50_000, 50_000);
        let body = Body::new(txs);
        let merkle = body.merkle_root();
        let genesis = Block::new(
            Header::new(1, now_unix(), Hash32::zero(), merkle, 0, 0),
            body,
        );
        let chain = Blockchain::new();
        chain.add_block(genesis).unwrap();
        chain.register_users(users);
        chain
    }

    #[test]
    fn test_generate_block_links_to_tip() {
        let users = test_users();
        let chain = funded_chain(&users);
        let tip = chain.tip_hash().unwrap();

        let miner = &users[0];
        let coinbase = Transaction::new(
            vec![],
            vec![TxOutput {
                to: miner.public_address,
                value: 50,
            }],
        );
        let block = generate_block(
            &chain,
            &CancelToken::new(),
            Body::new(vec![coinbase]),
            1,
            1,
        )
        .unwrap();

        assert_eq!(block.header.prev_hash, tip);
        chain.add_block(block).unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_mine_blocks_extends_chain() {
        let users = test_users();
        let chain = funded_chain(&users);
        let txgen = TxGenerator::new();
        let opts = MineOptions {
            block_count: 2,
            tx_count: 2,
            low: 10,
            high: 50,
            version: 1,
            difficulty: 1,
        };

        mine_blocks(&chain, &users, &txgen, &opts, &CancelToken::new()).unwrap();
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_mine_blocks_zero_count_is_noop() {
        let users = test_users();
        let chain = funded_chain(&users);
        let txgen = TxGenerator::new();
        let opts = MineOptions {
            block_count: 0,
            tx_count: 2,
            low: 10,
            high: 50,
            version: 1,
            difficulty: 1,
        };

        mine_blocks(&chain, &users, &txgen, &opts, &CancelToken::new()).unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_parent_cancellation_propagates() {
        let users = test_users();
        let chain = funded_chain(&users);
        let txgen = TxGenerator::new();
        let opts = MineOptions {
            block_count: 1,
            tx_count: 2,
            low: 10,
            high: 50,
            version: 1,
            difficulty: 1,
        };

        let parent = CancelToken::new();
        parent.cancel();
        assert!(matches!(
            mine_blocks(&chain, &users, &txgen, &opts, &parent),
            Err(MiningError::Canceled)
        ));
        assert_eq!(chain.len(), 1);
    }
}
