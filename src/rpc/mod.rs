//! RPC module - optional read-only HTTP view of the chain

mod server;

pub use server::*;
