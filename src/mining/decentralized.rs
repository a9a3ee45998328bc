//! Decentralized-style mining simulation
//!
//! Instead of racing workers over one body, each round races K distinct
//! candidate bodies under a shared time budget. If nobody finishes in time
//! (or the winner's append is rejected), the budget grows by the configured
//! multiplier and the round restarts, which keeps the simulation making
//! progress even against adverse headers.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::consensus::{Block, Body};
use crate::node::User;
use crate::storage::Blockchain;

use super::{generate_block, CancelToken, MiningError, TxGenerator};

/// Parameters of a candidate-race mining run
#[derive(Debug, Clone)]
pub struct DecentralizedMiningConfig {
    pub block_count: usize,
    pub tx_count: usize,
    pub candidate_count: usize,
    pub initial_time_limit: Duration,
    pub time_multiplier: f64,
    pub low: u32,
    pub high: u32,
    pub version: u32,
    pub difficulty: u32,
}

impl Default for DecentralizedMiningConfig {
    fn default() -> Self {
        Self {
            block_count: 1,
            tx_count: 100,
            candidate_count: 5,
            initial_time_limit: Duration::from_secs(5),
            time_multiplier: 1.5,
            low: 1,
            high: 1000,
            version: 1,
            difficulty: 3,
        }
    }
}

/// Mine `block_count` blocks by racing candidate bodies under a growing time
/// budget.
pub fn mine_blocks_decentralized(
    chain: &Blockchain,
    users: &[User],
    txgen: &TxGenerator,
    config: &DecentralizedMiningConfig,
    parent: &CancelToken,
) -> Result<(), MiningError> {
    for block_index in 0..config.block_count {
        let mut time_limit = config.initial_time_limit;

        loop {
            if parent.is_canceled() {
                return Err(MiningError::Canceled);
            }

            let candidates = generate_candidates(chain, users, txgen, config, parent)?;
            let round = parent.child_with_timeout(time_limit);

            match race_candidates(chain, config, candidates, &round) {
                Some(block) => match chain.add_block(block.clone()) {
                    Ok(()) => {
                        info!(
                            block = block_index,
                            height = chain.len() - 1,
                            txs = block.body.transactions.len(),
                            nonce = block.header.nonce,
                            time_limit_ms = time_limit.as_millis() as u64,
                            "accepted decentralized block"
                        );
                        break;
                    }
                    Err(err) => {
                        debug!(%err, "winning candidate rejected, growing time limit");
                        time_limit = grow(time_limit, config.time_multiplier);
                    }
                },
                None => {
                    if parent.is_canceled() {
                        return Err(MiningError::Canceled);
                    }
                    // Timeout is not an error, only a signal to grow the
                    // budget and retry.
                    debug!(
                        time_limit_ms = time_limit.as_millis() as u64,
                        "round timed out, growing time limit"
                    );
                    time_limit = grow(time_limit, config.time_multiplier);
                }
            }
        }
    }

    Ok(())
}

fn grow(limit: Duration, multiplier: f64) -> Duration {
    Duration::from_secs_f64(limit.as_secs_f64() * multiplier.max(1.0))
}

/// Sample up to `candidate_count` distinct bodies. Attempts that cannot be
/// funded are skipped; a round with zero candidates is unrecoverable.
fn generate_candidates(
    chain: &Blockchain,
    users: &[User],
    txgen: &TxGenerator,
    config: &DecentralizedMiningConfig,
    cancel: &CancelToken,
) -> Result<Vec<Body>, MiningError> {
    let mut candidates = Vec::with_capacity(config.candidate_count);
    for _ in 0..config.candidate_count {
        match txgen.generate(
            chain,
            users,
            config.low,
            config.high,
            config.tx_count,
            cancel,
        ) {
            Ok(txs) => candidates.push(Body::new(txs)),
            Err(MiningError::Canceled) => return Err(MiningError::Canceled),
            Err(err) => debug!(%err, "candidate generation attempt failed"),
        }
    }
    if candidates.is_empty() {
        return Err(MiningError::NoCandidates);
    }
    Ok(candidates)
}

/// Race one miner per candidate body; the first fully-formed block wins.
/// Returns `None` when the deadline (or a cancellation) stops the round
/// before anyone finishes.
fn race_candidates(
    chain: &Blockchain,
    config: &DecentralizedMiningConfig,
    candidates: Vec<Body>,
    round: &CancelToken,
) -> Option<Block> {
    let (result_tx, result_rx) = mpsc::sync_channel::<Block>(1);

    thread::scope(|scope| {
        for body in candidates {
            let round = round.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                if let Ok(block) =
                    generate_block(chain, &round, body, config.version, config.difficulty)
                {
                    let _ = result_tx.try_send(block);
                }
            });
        }
        drop(result_tx);

        let winner = result_rx.recv().ok();
        round.cancel();
        winner
    })
}
