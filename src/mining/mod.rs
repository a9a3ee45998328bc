//! Mining module - cancellable nonce search, random transaction generation,
//! and the two parallel mining strategies

mod cancel;
mod decentralized;
mod miner;
mod nonce;
mod txgen;

pub use cancel::*;
pub use decentralized::*;
pub use miner::*;
pub use nonce::*;
pub use txgen::*;

use thiserror::Error;

use crate::crypto::KeyError;
use crate::storage::ChainError;

/// Mining and scheduling errors
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("mining operation canceled")]
    Canceled,
    #[error("no valid nonce found")]
    NonceSpaceExhausted,
    #[error("merkle root not set")]
    MerkleRootUnset,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("invalid amount range")]
    InvalidAmountRange,
    #[error("no candidate body could be generated")]
    NoCandidates,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}
