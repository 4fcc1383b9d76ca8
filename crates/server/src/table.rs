// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Table task and handle.
//!
//! All table state is owned by a single task, connections talk to it
//! through a command channel so no lock ever guards the game.
use anyhow::Result;
use log::{error, info};
use std::time::Duration;
use tokio::{
    sync::{broadcast, mpsc},
    time,
};

use riverboat_core::{
    message::{Action, Snapshot},
    poker::{Chips, PlayerId, TableId},
};

use crate::ledger::Ledger;

mod state;
use state::State;

/// Handle to the table task shared by all player connections.
#[derive(Debug)]
pub struct Table {
    /// Channel for sending commands.
    commands_tx: mpsc::Sender<TableCommand>,
}

/// A message sent to player connections.
#[derive(Debug)]
pub enum TableMessage {
    /// Sends a snapshot to a client.
    Send(Snapshot),
    /// Close a client connection.
    Close,
}

/// Command for the table task.
#[derive(Debug)]
enum TableCommand {
    /// Join this table.
    Join {
        player_id: PlayerId,
        seat: usize,
        amount: Chips,
        table_tx: mpsc::Sender<TableMessage>,
    },
    /// Leave this table.
    Leave(PlayerId),
    /// Handle a player action.
    Action { player_id: PlayerId, action: Action },
}

impl Table {
    /// Creates a new table that manages players and game state.
    pub fn new(
        big_blind: Chips,
        turn_time: u32,
        ledger: Ledger,
        shutdown_broadcast_rx: broadcast::Receiver<()>,
        shutdown_complete_tx: mpsc::Sender<()>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(128);

        let mut task = TableTask {
            table_id: TableId::new_id(),
            big_blind,
            turn_time,
            ledger,
            commands_rx,
            shutdown_broadcast_rx,
            _shutdown_complete_tx: shutdown_complete_tx,
        };

        tokio::spawn(async move {
            if let Err(err) = task.run().await {
                error!("Table {} error {err}", task.table_id);
            }

            info!("Table task for table {} stopped", task.table_id);
        });

        Self { commands_tx }
    }

    /// A player joins this table.
    ///
    /// The outcome comes back on `table_tx` as a snapshot, with a note
    /// attached when the join is refused.
    pub async fn join(
        &self,
        player_id: &PlayerId,
        seat: usize,
        amount: Chips,
        table_tx: mpsc::Sender<TableMessage>,
    ) {
        let _ = self
            .commands_tx
            .send(TableCommand::Join {
                player_id: player_id.clone(),
                seat,
                amount,
                table_tx,
            })
            .await;
    }

    /// A player leaves the table.
    pub async fn leave(&self, player_id: &PlayerId) {
        let _ = self
            .commands_tx
            .send(TableCommand::Leave(player_id.clone()))
            .await;
    }

    /// Handle an action from a player.
    pub async fn action(&self, player_id: &PlayerId, action: Action) {
        let _ = self
            .commands_tx
            .send(TableCommand::Action {
                player_id: player_id.clone(),
                action,
            })
            .await;
    }
}

struct TableTask {
    /// This table identifier.
    table_id: TableId,
    /// The table stake.
    big_blind: Chips,
    /// Seconds a player has to act.
    turn_time: u32,
    /// The chips ledger.
    ledger: Ledger,
    /// Channel for receiving table commands.
    commands_rx: mpsc::Receiver<TableCommand>,
    /// Channel for listening shutdown notification.
    shutdown_broadcast_rx: broadcast::Receiver<()>,
    /// Sender that drops when this task is done.
    _shutdown_complete_tx: mpsc::Sender<()>,
}

impl TableTask {
    async fn run(&mut self) -> Result<()> {
        let mut state = State::new(
            self.table_id,
            self.big_blind,
            self.turn_time,
            self.ledger.clone(),
        );
        let mut ticks = time::interval(Duration::from_millis(500));

        loop {
            tokio::select! {
                // Server is shutting down exit this handler.
                _ = self.shutdown_broadcast_rx.recv() => break Ok(()),
                _ = ticks.tick() => {
                    state.tick().await;
                }
                // We have received a command from a client.
                res = self.commands_rx.recv() => match res {
                    Some(TableCommand::Join { player_id, seat, amount, table_tx }) => {
                        state.join(&player_id, seat, amount, table_tx).await;
                    }
                    Some(TableCommand::Leave(player_id)) => {
                        state.leave(&player_id).await;
                    }
                    Some(TableCommand::Action { player_id, action }) => {
                        state.action(&player_id, action).await;
                    }
                    None => break Ok(()),
                },
            }
        }
    }
}
