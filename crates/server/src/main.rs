// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0
use clap::{Parser, Subcommand};
use log::error;
use std::path::PathBuf;

use riverboat_core::poker::{Chips, PlayerId};
use riverboat_server::{ledger::Ledger, server};

#[derive(Debug, Parser)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the poker server.
    Serve {
        /// The server listening address.
        #[clap(long, short, default_value = "127.0.0.1")]
        address: String,
        /// The server listening port.
        #[clap(long, short, default_value_t = 9871)]
        port: u16,
        /// The table big blind.
        #[clap(long, default_value_t = 100)]
        big_blind: u32,
        /// Seconds a player has to act.
        #[clap(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(5..=120))]
        turn_time: u32,
        /// The ledger database path.
        #[clap(long, default_value = "riverboat.db")]
        db: PathBuf,
    },
    /// Reset a player ledger balance.
    Replenish {
        /// The ledger database path.
        #[clap(long, default_value = "riverboat.db")]
        db: PathBuf,
        /// The player username.
        username: String,
        /// The new balance.
        chips: u32,
    },
    /// Show a player ledger balance.
    Balance {
        /// The ledger database path.
        #[clap(long, default_value = "riverboat.db")]
        db: PathBuf,
        /// The player username.
        username: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let res = match cli.command {
        Command::Serve {
            address,
            port,
            big_blind,
            turn_time,
            db,
        } => {
            let config = server::Config {
                address,
                port,
                big_blind: Chips::new(big_blind),
                turn_time,
                db,
            };

            server::run(config).await
        }
        Command::Replenish {
            db,
            username,
            chips,
        } => replenish(db, username, chips).await,
        Command::Balance { db, username } => balance(db, username).await,
    };

    if let Err(e) = res {
        error!("{e}");
    }
}

async fn replenish(db: PathBuf, username: String, chips: u32) -> anyhow::Result<()> {
    let ledger = Ledger::open(db)?;
    let player_id = PlayerId::new(username);
    ledger.replenish(&player_id, Chips::new(chips)).await?;
    let balance = ledger.balance(&player_id).await?;
    println!("{player_id} balance {balance}");
    Ok(())
}

async fn balance(db: PathBuf, username: String) -> anyhow::Result<()> {
    let ledger = Ledger::open(db)?;
    let player_id = PlayerId::new(username);
    let balance = ledger.balance(&player_id).await?;
    println!("{player_id} balance {balance}");
    Ok(())
}
