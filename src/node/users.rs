//! User records and generation
//!
//! Every user owns a secp256k1 key pair derived from a mnemonic-like seed
//! (SHA-256 of a time-derived token) and a display name drawn from the name
//! list without repetition.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::crypto::{generate_address, KeyError, PrivateKey, PublicAddress, PublicKey};

/// A key-owning participant
#[derive(Debug, Clone)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub created_at: u32,
    pub public_key: PublicKey,
    pub public_address: PublicAddress,
    pub private_key: PrivateKey,
}

impl User {
    /// Build a user from a mnemonic seed, deriving key pair and address.
    pub fn from_mnemonic(id: u32, name: String, mnemonic: &str) -> Result<Self, KeyError> {
        let private_key = PrivateKey::from_mnemonic(mnemonic)?;
        let public_key = private_key.public_key();
        let public_address = generate_address(&public_key.0);

        Ok(Self {
            id,
            name,
            created_at: now_unix(),
            public_key,
            public_address,
            private_key,
        })
    }
}

fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

fn time_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

/// Generate `n` users with unique display names from `names`.
///
/// The request is clamped to the size of the name pool; every name can only
/// be handed out once.
pub fn generate_users(names: &[String], n: usize) -> Result<Vec<User>, KeyError> {
    if names.is_empty() || n == 0 {
        return Ok(Vec::new());
    }
    let count = if n > names.len() {
        warn!(
            requested = n,
            available = names.len(),
            "user count clamped to name pool size"
        );
        names.len()
    } else {
        n
    };

    let mut rng = rand::thread_rng();
    let mut used: HashSet<&str> = HashSet::new();
    let mut users = Vec::with_capacity(count);

    for id in 1..=count as u32 {
        let mut name = &names[rng.gen_range(0..names.len())];
        while used.contains(name.as_str()) {
            name = &names[rng.gen_range(0..names.len())];
        }
        used.insert(name.as_str());

        let token = format!("{}:{}", id, time_nanos());
        let mnemonic = hex::encode(Sha256::digest(token.as_bytes()));
        users.push(User::from_mnemonic(id, name.clone(), &mnemonic)?);
    }

    Ok(users)
}

/// Find a user by their compressed public key bytes.
pub fn user_by_public_key<'a>(users: &'a [User], public_key: &PublicKey) -> Option<&'a User> {
    users.iter().find(|u| u.public_key == *public_key)
}
