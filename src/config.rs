//! Environment configuration
//!
//! Every knob is optional; missing or unparsable values fall back to the
//! defaults. The name list ships with the crate under `assets/`.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_VERSION: u32 = 1;
pub const DEFAULT_DIFFICULTY: u32 = 3;
pub const DEFAULT_USER_COUNT: usize = 100;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub version: u32,
    pub difficulty: u32,
    pub user_count: usize,
    pub port: u16,
    pub name_list_path: PathBuf,
}

impl Config {
    /// Load from `BLOCK_VERSION`, `BLOCK_DIFFICULTY`, `USER_COUNT`, and
    /// `PORT`.
    pub fn from_env() -> Self {
        Self {
            version: parse_var("BLOCK_VERSION", DEFAULT_VERSION),
            difficulty: parse_var("BLOCK_DIFFICULTY", DEFAULT_DIFFICULTY),
            user_count: parse_var("USER_COUNT", DEFAULT_USER_COUNT),
            port: parse_var("PORT", DEFAULT_PORT),
            name_list_path: default_name_list_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            difficulty: DEFAULT_DIFFICULTY,
            user_count: DEFAULT_USER_COUNT,
            port: DEFAULT_PORT,
            name_list_path: default_name_list_path(),
        }
    }
}

fn default_name_list_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join("name_list.txt")
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
