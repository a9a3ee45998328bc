//! Interactive shell
//!
//! A line-oriented command loop over the running chain. Query arguments may
//! be given inline (`getblock 2`) or entered at a follow-up prompt. Every
//! command failure prints a single explanatory line and the shell continues.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::consensus::{hash_meets_difficulty, Header};
use crate::crypto::{PublicAddress, PublicKey};
use crate::mining::{
    mine_blocks, mine_blocks_decentralized, CancelToken, DecentralizedMiningConfig, MineOptions,
    TxGenerator,
};
use crate::node::User;
use crate::storage::Blockchain;

pub fn print_menu() {
    println!("╔═══════════════════════════════════════════════════════════════════════╗");
    println!("║                      ARCHAS CLI - AVAILABLE COMMANDS                  ║");
    println!("╠═══════════════════════════════════════════════════════════════════════╣");
    println!("║ MINING:                                                               ║");
    println!("║   mineblocks          - Mine new blocks with random transactions      ║");
    println!("║   simulatedecentralizedmining - Race candidate blocks with deadlines  ║");
    println!("║                                                                       ║");
    println!("║ BLOCKCHAIN INFO:                                                      ║");
    println!("║   height              - Show current blockchain height                ║");
    println!("║   stats               - Show blockchain statistics                    ║");
    println!("║   validatechain       - Validate entire blockchain integrity          ║");
    println!("║                                                                       ║");
    println!("║ BLOCK QUERIES:                                                        ║");
    println!("║   getblock            - Get full block details by index               ║");
    println!("║   getblockheader      - Get block header by index                     ║");
    println!("║   getblockhash        - Get block hash by index                       ║");
    println!("║   getblocktransactions- Get block transactions by index               ║");
    println!("║   getallheaders       - Get all block headers                         ║");
    println!("║                                                                       ║");
    println!("║ USER & BALANCE:                                                       ║");
    println!("║   balance             - Show all user balances (table)                ║");
    println!("║   getuserbalance      - Get balance by name, public key, or address   ║");
    println!("║   richlist            - Show top users by balance                     ║");
    println!("║   getutxos            - Get UTXOs by name, public key, or address     ║");
    println!("║                                                                       ║");
    println!("║ OTHER:                                                                ║");
    println!("║   help                - Show this menu                                ║");
    println!("║   exit                - Exit the program                              ║");
    println!("╚═══════════════════════════════════════════════════════════════════════╝");
}

/// Run the interactive shell until `exit` or end of input.
pub fn run_shell(chain: Arc<Blockchain>, users: Vec<User>, cfg: Config) {
    let txgen = TxGenerator::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    print_menu();
    loop {
        print!("\nEnter command: ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };
        let mut parts = line.split_whitespace();
        let command = match parts.next() {
            Some(cmd) => cmd.to_string(),
            None => continue,
        };
        let inline_arg = parts.next().map(str::to_string);

        match command.as_str() {
            "mineblocks" => cmd_mine_blocks(&chain, &users, &txgen, &cfg, &mut lines),
            "simulatedecentralizedmining" => {
                cmd_decentralized(&chain, &users, &txgen, &cfg, &mut lines)
            }
            "height" => println!("Current blockchain height: {}", chain.len()),
            "stats" => cmd_stats(&chain, &users, &cfg),
            "validatechain" => {
                cmd_validate_chain(&chain);
            }
            "getblock" => cmd_block_json(&chain, inline_arg, &mut lines, BlockView::Full),
            "getblockheader" => cmd_block_json(&chain, inline_arg, &mut lines, BlockView::Header),
            "getblocktransactions" => {
                cmd_block_json(&chain, inline_arg, &mut lines, BlockView::Transactions)
            }
            "getblockhash" => cmd_block_hash(&chain, inline_arg, &mut lines),
            "getallheaders" => cmd_all_headers(&chain),
            "balance" => cmd_balance_table(&chain, &users),
            "getuserbalance" => cmd_user_balance(&chain, &users, inline_arg, &mut lines),
            "richlist" => cmd_richlist(&chain, &users, inline_arg, &mut lines),
            "getutxos" => cmd_utxos(&chain, &users, inline_arg, &mut lines),
            "help" => print_menu(),
            "exit" => {
                println!("Exiting...");
                break;
            }
            _ => println!("Unknown command"),
        }
    }
}

type Lines<'a> = std::io::Lines<io::StdinLock<'a>>;

fn read_value(prompt: &str, inline: Option<String>, lines: &mut Lines) -> Option<String> {
    if let Some(value) = inline {
        return Some(value);
    }
    println!("{prompt}");
    match lines.next() {
        Some(Ok(line)) => Some(line.trim().to_string()),
        _ => None,
    }
}

fn read_number<T: std::str::FromStr>(prompt: &str, lines: &mut Lines) -> Option<T> {
    let raw = read_value(prompt, None, lines)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            println!("Failed to read number, try again");
            None
        }
    }
}

fn read_number_with_default<T: std::str::FromStr>(
    prompt: &str,
    default: T,
    lines: &mut Lines,
) -> T {
    match read_value(prompt, None, lines) {
        Some(raw) => raw.parse().unwrap_or(default),
        None => default,
    }
}

fn cmd_mine_blocks(
    chain: &Blockchain,
    users: &[User],
    txgen: &TxGenerator,
    cfg: &Config,
    lines: &mut Lines,
) {
    let Some(block_count) = read_number::<usize>("Please enter number of blocks to mine:", lines)
    else {
        return;
    };
    let Some(tx_count) =
        read_number::<usize>("Please enter number of transactions per block:", lines)
    else {
        return;
    };
    let Some(low) = read_number::<u32>("Please enter minimum transaction value:", lines) else {
        return;
    };
    let Some(high) = read_number::<u32>("Please enter maximum transaction value:", lines) else {
        return;
    };

    if block_count == 0 || tx_count == 0 {
        println!("Invalid input: counts must be positive");
        return;
    }
    if high < low {
        println!("Invalid transaction value range: minimum cannot exceed maximum");
        return;
    }

    let opts = MineOptions {
        block_count,
        tx_count,
        low,
        high,
        version: cfg.version,
        difficulty: cfg.difficulty,
    };
    if let Err(err) = mine_blocks(chain, users, txgen, &opts, &CancelToken::new()) {
        println!("Error mining blocks: {err}");
    }
}

fn cmd_decentralized(
    chain: &Blockchain,
    users: &[User],
    txgen: &TxGenerator,
    cfg: &Config,
    lines: &mut Lines,
) {
    let mut config = DecentralizedMiningConfig {
        version: cfg.version,
        difficulty: cfg.difficulty,
        ..DecentralizedMiningConfig::default()
    };

    config.block_count =
        read_number_with_default("Please enter number of blocks to mine (default: 1):", 1, lines);
    config.tx_count = read_number_with_default(
        "Please enter number of transactions per candidate block (default: 100):",
        100,
        lines,
    );
    config.candidate_count = read_number_with_default(
        "Please enter number of candidate blocks to generate (default: 5):",
        5,
        lines,
    );
    let limit_secs: u64 = read_number_with_default(
        "Please enter initial time limit in seconds (default: 5):",
        5,
        lines,
    );
    config.initial_time_limit = Duration::from_secs(limit_secs.max(1));
    let low: u32 =
        read_number_with_default("Please enter minimum transaction value (default: 1):", 1, lines);
    let high: u32 = read_number_with_default(
        "Please enter maximum transaction value (default: 1000):",
        1000,
        lines,
    );
    if high < low {
        println!("Invalid transaction value range, using defaults");
        config.low = 1;
        config.high = 1000;
    } else {
        config.low = low;
        config.high = high;
    }

    println!("\nStarting decentralized mining simulation...");
    println!(
        "Configuration: {} blocks, {} candidates per round, {} tx per candidate, {:?} initial time limit",
        config.block_count, config.candidate_count, config.tx_count, config.initial_time_limit
    );

    match mine_blocks_decentralized(chain, users, txgen, &config, &CancelToken::new()) {
        Ok(()) => println!("Decentralized mining completed successfully!"),
        Err(err) => println!("Error in decentralized mining: {err}"),
    }
}

fn cmd_stats(chain: &Blockchain, users: &[User], cfg: &Config) {
    let blocks = chain.blocks();
    let total_blocks = blocks.len();
    let total_txs: usize = blocks.iter().map(|b| b.body.transactions.len()).sum();
    let avg = if total_blocks > 0 {
        total_txs as f64 / total_blocks as f64
    } else {
        0.0
    };

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                   BLOCKCHAIN STATISTICS                       ║");
    println!("╠═══════════════════════════════════════════════════════════════╣");
    println!("║ Total Blocks:              {total_blocks:>34} ║");
    println!("║ Total Transactions:        {total_txs:>34} ║");
    println!("║ Avg Transactions/Block:    {avg:>34.2} ║");
    println!("║ Total Users:               {:>34} ║", users.len());
    println!("║ Current Version:           {:>34} ║", cfg.version);
    println!("║ Current Difficulty:        {:>34} ║", cfg.difficulty);
    println!("╚═══════════════════════════════════════════════════════════════╝");
}

/// Walk the chain and re-check every tip link and difficulty target.
pub fn cmd_validate_chain(chain: &Blockchain) -> bool {
    println!("Validating blockchain...");
    let blocks = chain.blocks();
    let mut valid = true;

    for i in 1..blocks.len() {
        let prev_hash = blocks[i - 1].header.hash();
        let header = &blocks[i].header;

        if prev_hash != header.prev_hash {
            println!("Block {i}: previous hash mismatch!");
            valid = false;
        }
        if !hash_meets_difficulty(&blocks[i].header.hash(), header.difficulty) {
            println!("Block {i}: hash doesn't meet difficulty requirements!");
            valid = false;
        }
    }

    if valid {
        println!("Blockchain is valid!");
    } else {
        println!("Blockchain validation failed!");
    }
    valid
}

enum BlockView {
    Full,
    Header,
    Transactions,
}

fn read_block_index(
    chain: &Blockchain,
    inline: Option<String>,
    lines: &mut Lines,
) -> Option<usize> {
    let raw = read_value("Please enter block index:", inline, lines)?;
    let index: usize = match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            println!("Invalid block index: not a number");
            return None;
        }
    };
    if index >= chain.len() {
        println!("Invalid block index: block index out of range");
        return None;
    }
    Some(index)
}

fn cmd_block_json(chain: &Blockchain, inline: Option<String>, lines: &mut Lines, view: BlockView) {
    let Some(index) = read_block_index(chain, inline, lines) else {
        return;
    };
    let block = match chain.block_at(index) {
        Ok(block) => block,
        Err(err) => {
            println!("Error retrieving block: {err}");
            return;
        }
    };

    let rendered = match view {
        BlockView::Full => serde_json::to_string_pretty(&block),
        BlockView::Header => serde_json::to_string_pretty(&block.header),
        BlockView::Transactions => serde_json::to_string_pretty(&block.body.transactions),
    };
    match rendered {
        Ok(json) => println!("Block data at index {index}:\n{json}"),
        Err(err) => println!("Error rendering block: {err}"),
    }
}

fn cmd_block_hash(chain: &Blockchain, inline: Option<String>, lines: &mut Lines) {
    let Some(index) = read_block_index(chain, inline, lines) else {
        return;
    };
    match chain.block_at(index) {
        Ok(block) => println!("Block hash at index {index}: {}", block.hash()),
        Err(err) => println!("Error retrieving block: {err}"),
    }
}

fn cmd_all_headers(chain: &Blockchain) {
    let headers: Vec<Header> = chain.blocks().into_iter().map(|b| b.header).collect();
    match serde_json::to_string_pretty(&headers) {
        Ok(json) => println!("All block headers:\n{json}"),
        Err(err) => println!("Error rendering headers: {err}"),
    }
}

/// Resolve shell input as a user name, a 66-hex public key, or a 40-hex
/// address. A known address that belongs to no generated user still resolves
/// (with no user attached).
fn find_user_by_input<'a>(
    input: &str,
    users: &'a [User],
) -> Result<(Option<&'a User>, PublicAddress), String> {
    if let Some(user) = users.iter().find(|u| u.name == input) {
        return Ok((Some(user), user.public_address));
    }

    let bytes = hex::decode(input)
        .map_err(|_| "input is neither a valid user name nor a valid hex string".to_string())?;

    match bytes.len() {
        20 => {
            let address = PublicAddress::from_hex(input).expect("length checked");
            let user = users.iter().find(|u| u.public_address == address);
            Ok((user, address))
        }
        33 => {
            let key = PublicKey::from_hex(input).map_err(|err| err.to_string())?;
            users
                .iter()
                .find(|u| u.public_key == key)
                .map(|u| (Some(u), u.public_address))
                .ok_or_else(|| "no user found with that public key".to_string())
        }
        _ => Err(
            "hex input must be either 40 characters (public address) or 66 characters (public key)"
                .to_string(),
        ),
    }
}

fn print_lookup_hint(err: &str) {
    if err.starts_with("input is neither") {
        println!("Hint: try a user name, public key (66 hex chars), or public address (40 hex chars) from the 'balance' command");
    } else if err.starts_with("no user found") {
        println!("Hint: use the 'balance' command to see all users and their public keys");
    } else {
        println!("Hint: public address = 40 hex chars, public key = 66 hex chars");
    }
}

fn cmd_user_balance(
    chain: &Blockchain,
    users: &[User],
    inline: Option<String>,
    lines: &mut Lines,
) {
    let Some(input) = read_value(
        "Please enter user name, public key (hex), or public address (hex):",
        inline,
        lines,
    ) else {
        return;
    };

    let (user, address) = match find_user_by_input(&input, users) {
        Ok(found) => found,
        Err(err) => {
            println!("Error: {err}");
            print_lookup_hint(&err);
            return;
        }
    };

    let balance = chain.balance(&address);
    println!("\n╔═══════════════════════════════════════════════════════════════════════════════════════════╗");
    println!(
        "║ User:       {:<77} ║",
        user.map(|u| u.name.as_str()).unwrap_or("Unknown")
    );
    println!("║ Balance:    {balance:<77} ║");
    println!("║ Address:    {:<77} ║", address.to_hex());
    if let Some(user) = user {
        println!("║ Public Key: {:<77} ║", user.public_key.to_hex());
    }
    println!("╚═══════════════════════════════════════════════════════════════════════════════════════════╝");
}

fn cmd_balance_table(chain: &Blockchain, users: &[User]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════════════════════╗");
    println!("║                                     USER BALANCES                                         ║");
    println!("╠════════════════════════════════╦═══════════════╦══════════════════════════════════════════╣");
    println!("║            NAME                ║    BALANCE    ║              PUBLIC ADDRESS              ║");
    println!("╠════════════════════════════════╬═══════════════╬══════════════════════════════════════════╣");
    for user in users {
        let balance = chain.balance(&user.public_address);
        println!(
            "║ {:<30} ║ {:>13} ║ {:>40} ║",
            user.name,
            balance,
            user.public_address.to_hex()
        );
    }
    println!("╚════════════════════════════════╩═══════════════╩══════════════════════════════════════════╝");
}

fn cmd_richlist(chain: &Blockchain, users: &[User], inline: Option<String>, lines: &mut Lines) {
    let top_n: usize = match inline {
        Some(raw) => raw.parse().unwrap_or(10),
        None => read_number_with_default("How many top users to show? (default: 10)", 10, lines),
    };

    let mut balances: Vec<(&User, u32)> = users
        .iter()
        .map(|user| (user, chain.balance(&user.public_address)))
        .collect();
    balances.sort_by(|a, b| b.1.cmp(&a.1));
    let top_n = top_n.min(balances.len());

    println!("\n╔═══════════════════════════════════════════════════════════════════════════════════════════╗");
    println!("║                                  TOP {top_n:<3} RICHEST USERS                                    ║");
    println!("╠══════╦═════════════════════════════╦═══════════════╦══════════════════════════════════════╣");
    println!("║ RANK ║           NAME              ║    BALANCE    ║           PUBLIC ADDRESS             ║");
    println!("╠══════╬═════════════════════════════╬═══════════════╬══════════════════════════════════════╣");
    for (rank, (user, balance)) in balances.iter().take(top_n).enumerate() {
        println!(
            "║ {:>4} ║ {:<27} ║ {:>13} ║ {:>36} ║",
            rank + 1,
            user.name,
            balance,
            user.public_address.to_hex()
        );
    }
    println!("╚══════╩═════════════════════════════╩═══════════════╩══════════════════════════════════════╝");
}

fn cmd_utxos(chain: &Blockchain, users: &[User], inline: Option<String>, lines: &mut Lines) {
    let Some(input) = read_value(
        "Please enter user name, public key (hex), or public address (hex):",
        inline,
        lines,
    ) else {
        return;
    };

    let (user, address) = match find_user_by_input(&input, users) {
        Ok(found) => found,
        Err(err) => {
            println!("Error: {err}");
            print_lookup_hint(&err);
            return;
        }
    };

    let utxos = chain.utxos_for_address(&address);
    let display_name = user.map(|u| u.name.clone()).unwrap_or_else(|| address.to_hex());

    println!("\n╔══════════════════════════════════════════════════════════════════════════════════════════╗");
    println!("║                            UTXOs for {display_name:<51} ║");
    println!("╠══════╦═══════════════╦═══════════════════════════════════════════════════════════════════╣");
    println!("║  #   ║     VALUE     ║                    TRANSACTION ID:INDEX                           ║");
    println!("╠══════╬═══════════════╬═══════════════════════════════════════════════════════════════════╣");

    let mut total: u64 = 0;
    if utxos.is_empty() {
        println!("║                          No UTXOs found for this address                                 ║");
    } else {
        for (i, utxo) in utxos.iter().enumerate() {
            println!(
                "║ {:>4} ║ {:>13} ║ {:>58}:{:<6} ║",
                i + 1,
                utxo.value,
                &utxo.outpoint.tx_id.to_hex()[..58],
                utxo.outpoint.index
            );
            total += utxo.value as u64;
        }
    }

    println!("╠══════╩═══════════════╩═══════════════════════════════════════════════════════════════════╣");
    println!(
        "║ Total UTXOs: {:<10}                            Total Value: {:<24} ║",
        utxos.len(),
        total
    );
    println!("╚══════════════════════════════════════════════════════════════════════════════════════════╝");
}
