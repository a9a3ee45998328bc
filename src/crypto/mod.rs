//! Cryptography module - Archas hashing, secp256k1 ECDSA, HASH160 addresses,
//! Merkle trees

mod address;
mod archas;
mod hash;
mod keys;
mod merkle;

pub use address::*;
pub use archas::*;
pub use hash::*;
pub use keys::*;
pub use merkle::*;
