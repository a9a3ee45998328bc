//! Node module - user generation, name-list loading, and genesis bootstrap

mod genesis;
mod namelist;
mod users;

pub use genesis::*;
pub use namelist::*;
pub use users::*;
