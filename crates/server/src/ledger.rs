// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Chips ledger persistence.
//!
//! The ledger is the durable account each player draws buy-ins from and
//! cashes out to, it lives in sqlite so balances survive server restarts.
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::{path::Path, sync::Arc};
use thiserror::Error;

use riverboat_core::poker::{Chips, PlayerId};

/// A ledger operation failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The player has no ledger record.
    #[error("player not found")]
    NotFound,
    /// The balance does not cover the requested buy-in.
    #[error("insufficient funds")]
    InsufficientFunds,
    /// A database failure.
    #[error("ledger database error: {0}")]
    Db(#[from] rusqlite::Error),
    /// The blocking task failed.
    #[error("ledger task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Ledger of player chips accounts.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Arc<Mutex<Connection>>,
}

impl Ledger {
    /// Opens a ledger database, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        Self::init(Connection::open(path)?)
    }

    /// Opens an in memory ledger database.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS players (
               id TEXT PRIMARY KEY,
               chips INTEGER NOT NULL,
               created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
               last_update DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            (),
        )?;

        Ok(Ledger {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Gets a player balance.
    pub async fn balance(&self, player_id: &PlayerId) -> Result<Chips, LedgerError> {
        let db = self.db.clone();
        let player_id = player_id.clone();
        tokio::task::spawn_blocking(move || {
            let db = db.lock();

            let res = db.query_row(
                "SELECT chips FROM players WHERE id = ?1",
                params![player_id.as_str()],
                |row| row.get::<usize, i64>(0),
            );

            match res {
                Ok(chips) => Ok(Chips::new(chips as u32)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Err(LedgerError::NotFound),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    /// Withdraws a buy-in from a player account.
    ///
    /// An unknown player gets an account with `default_chips` before the
    /// withdrawal, so first joins work out of the box. Fails without
    /// mutating when the balance does not cover the amount.
    pub async fn withdraw(
        &self,
        player_id: &PlayerId,
        amount: Chips,
        default_chips: Chips,
    ) -> Result<(), LedgerError> {
        let db = self.db.clone();
        let player_id = player_id.clone();
        tokio::task::spawn_blocking(move || {
            let mut db = db.lock();
            let tx = db.transaction()?;

            let res = tx.query_row(
                "SELECT chips FROM players WHERE id = ?1",
                params![player_id.as_str()],
                |row| row.get::<usize, i64>(0),
            );

            let balance = match res {
                Ok(chips) => Chips::new(chips as u32),
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.execute(
                        "INSERT INTO players (id, chips) VALUES (?1, ?2)",
                        params![player_id.as_str(), default_chips.amount()],
                    )?;
                    default_chips
                }
                Err(e) => return Err(e.into()),
            };

            if balance < amount {
                return Err(LedgerError::InsufficientFunds);
            }

            tx.execute(
                "UPDATE players SET
                   chips = ?1,
                   last_update = CURRENT_TIMESTAMP
                 WHERE id = ?2",
                params![(balance - amount).amount(), player_id.as_str()],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await?
    }

    /// Deposits chips into a player account.
    pub async fn deposit(&self, player_id: &PlayerId, amount: Chips) -> Result<(), LedgerError> {
        let db = self.db.clone();
        let player_id = player_id.clone();
        tokio::task::spawn_blocking(move || {
            let db = db.lock();

            let count = db.execute(
                "UPDATE players SET
                   chips = chips + ?1,
                   last_update = CURRENT_TIMESTAMP
                 WHERE id = ?2",
                params![amount.amount(), player_id.as_str()],
            )?;

            if count == 0 {
                return Err(LedgerError::NotFound);
            }

            Ok(())
        })
        .await?
    }

    /// Resets a player account to the given balance.
    pub async fn replenish(
        &self,
        player_id: &PlayerId,
        amount: Chips,
    ) -> Result<(), LedgerError> {
        let db = self.db.clone();
        let player_id = player_id.clone();
        tokio::task::spawn_blocking(move || {
            let db = db.lock();

            let count = db.execute(
                "UPDATE players SET
                   chips = ?1,
                   last_update = CURRENT_TIMESTAMP
                 WHERE id = ?2",
                params![amount.amount(), player_id.as_str()],
            )?;

            if count == 0 {
                return Err(LedgerError::NotFound);
            }

            Ok(())
        })
        .await?
    }
}
