//! Archas blockchain node
//!
//! Boots the engine: configuration, user generation, funded genesis, the
//! read-only HTTP API, and the interactive shell.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use archas::cli::run_shell;
use archas::config::Config;
use archas::constants::{GENESIS_FUND_HIGH, GENESIS_FUND_LOW};
use archas::mining::CancelToken;
use archas::node::{generate_users, init_blockchain_with_funds, load_name_list};
use archas::rpc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env();
    info!(version = cfg.version, difficulty = cfg.difficulty, "loaded configuration");

    let names = match load_name_list(&cfg.name_list_path) {
        Ok(names) => names,
        Err(err) => {
            eprintln!(
                "failed to load name list from {}: {err}",
                cfg.name_list_path.display()
            );
            std::process::exit(1);
        }
    };

    let users = match generate_users(&names, cfg.user_count) {
        Ok(users) => users,
        Err(err) => {
            eprintln!("failed to generate users: {err}");
            std::process::exit(1);
        }
    };
    info!(count = users.len(), "generated users");

    info!("mining genesis block...");
    let chain = init_blockchain_with_funds(
        &CancelToken::new(),
        &users,
        GENESIS_FUND_LOW,
        GENESIS_FUND_HIGH,
        cfg.version,
        cfg.difficulty,
    )
    .expect("genesis block could not be mined");
    chain.register_users(&users);
    let chain = Arc::new(chain);
    info!(height = chain.len(), "chain initialized");

    let api_chain = chain.clone();
    let api_port = cfg.port;
    tokio::spawn(async move {
        if let Err(err) = rpc::serve(api_chain, api_port).await {
            eprintln!("http api error: {err}");
        }
    });

    let shell = tokio::task::spawn_blocking(move || run_shell(chain, users, cfg));

    tokio::select! {
        result = shell => {
            if let Err(err) = result {
                eprintln!("shell task failed: {err}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }
}
