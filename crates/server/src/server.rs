// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Riverboat Poker server entry point.
//!
//! Clients talk newline delimited JSON: a hello frame first, then
//! action frames in and snapshot frames out.
use anyhow::{Result, anyhow};
use log::{error, info};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    signal,
    sync::{broadcast, mpsc},
    time::{self, Duration},
};

use riverboat_core::{
    message::{Action, Hello},
    poker::{Chips, PlayerId},
};

use crate::{
    ledger::Ledger,
    table::{Table, TableMessage},
};

/// Networking config.
#[derive(Debug)]
pub struct Config {
    /// The server listening address.
    pub address: String,
    /// The server listening port.
    pub port: u16,
    /// The table big blind.
    pub big_blind: Chips,
    /// Seconds a player has to act.
    pub turn_time: u32,
    /// The ledger database path.
    pub db: PathBuf,
}

/// The server that handles client connections.
struct Server {
    /// The table on this server.
    table: Arc<Table>,
    /// The server listener.
    listener: TcpListener,
    /// Shutdown notification channel.
    shutdown_broadcast_tx: broadcast::Sender<()>,
    /// Shutdown sender cloned by each connection.
    shutdown_complete_tx: mpsc::Sender<()>,
}

/// Client connection handler.
struct Handler {
    /// The table on this server.
    table: Arc<Table>,
    /// Channel for listening shutdown notification.
    shutdown_broadcast_rx: broadcast::Receiver<()>,
    /// Sender that drops when this connection is done.
    _shutdown_complete_tx: mpsc::Sender<()>,
}

/// Server entry point.
pub async fn run(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.address, config.port);
    info!("Starting server listening on {addr}");

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow!("Tcp listener bind error: {e}"))?;

    let ledger = Ledger::open(&config.db)?;

    let shutdown_signal = signal::ctrl_c();
    let (shutdown_broadcast_tx, _) = broadcast::channel(1);
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel(1);

    let table = Arc::new(Table::new(
        config.big_blind,
        config.turn_time,
        ledger,
        shutdown_broadcast_tx.subscribe(),
        shutdown_complete_tx.clone(),
    ));

    let mut server = Server {
        table,
        listener,
        shutdown_broadcast_tx,
        shutdown_complete_tx,
    };

    tokio::select! {
        res = server.run() => {
            res.map_err(|e| anyhow!("Tcp listener accept error: {e}"))?;
        }
        _ = shutdown_signal => {
            info!("Received shutdown signal...");
        }
    }

    // Wait for all connection to shutdown.
    let Server {
        shutdown_broadcast_tx,
        shutdown_complete_tx,
        ..
    } = server;

    // Notify all connections to start shutdown then wait for all connections to
    // terminate and drop their shutdown channel.
    drop(shutdown_broadcast_tx);
    drop(shutdown_complete_tx);
    let _ = shutdown_complete_rx.recv().await;

    Ok(())
}

impl Server {
    /// Runs the server.
    async fn run(&mut self) -> Result<()> {
        loop {
            let (socket, addr) = self.accept_with_retry().await?;
            info!("Accepted connection from {addr}");

            let mut handler = Handler {
                table: self.table.clone(),
                shutdown_broadcast_rx: self.shutdown_broadcast_tx.subscribe(),
                _shutdown_complete_tx: self.shutdown_complete_tx.clone(),
            };

            // Spawn a task to handle connection messages.
            tokio::spawn(async move {
                if let Err(err) = handler.run(socket, addr).await {
                    error!("Connection to {addr} {err}");
                }

                info!("Connection to {addr} closed");
            });
        }
    }

    /// Accepts a connection with retries.
    async fn accept_with_retry(&self) -> Result<(TcpStream, SocketAddr)> {
        let mut retry = 0;
        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    return Ok((socket, addr));
                }
                Err(err) => {
                    if retry == 5 {
                        return Err(err.into());
                    }
                }
            }

            time::sleep(Duration::from_secs(1 << retry)).await;
            retry += 1;
        }
    }
}

impl Handler {
    /// Handle connection messages.
    async fn run(&mut self, socket: TcpStream, addr: SocketAddr) -> Result<()> {
        let (read_half, mut write_half) = socket.into_split();
        let mut lines = BufReader::new(read_half).lines();

        // The first frame identifies the player, drop the connection if
        // it does not parse.
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let hello = serde_json::from_str::<Hello>(&line)
            .map_err(|e| anyhow!("invalid hello from {addr}: {e}"))?;
        let player_id = PlayerId::new(hello.username);

        info!("Connection {addr} identified as {player_id}");

        let (table_tx, mut table_rx) = mpsc::channel(64);

        let mut closed_by_table = false;
        let res = loop {
            tokio::select! {
                _ = self.shutdown_broadcast_rx.recv() => break Ok(()),
                res = lines.next_line() => match res {
                    Ok(Some(line)) => match serde_json::from_str::<Action>(&line) {
                        Ok(Action::Join { amount, seat }) => {
                            self.table
                                .join(&player_id, seat, amount, table_tx.clone())
                                .await;
                        }
                        Ok(Action::Leave) => self.table.leave(&player_id).await,
                        Ok(action) => self.table.action(&player_id, action).await,
                        Err(err) => break Err(anyhow!("invalid action from {player_id}: {err}")),
                    },
                    Ok(None) => break Ok(()),
                    Err(err) => break Err(err.into()),
                },
                msg = table_rx.recv() => match msg {
                    Some(TableMessage::Send(snapshot)) => match serde_json::to_string(&snapshot) {
                        Ok(mut line) => {
                            line.push('\n');
                            if let Err(err) = write_half.write_all(line.as_bytes()).await {
                                break Err(err.into());
                            }
                        }
                        Err(err) => break Err(err.into()),
                    },
                    Some(TableMessage::Close) | None => {
                        closed_by_table = true;
                        break Ok(());
                    }
                },
            }
        };

        // The table already dropped this player when it closed the
        // connection, a socket drop needs an explicit leave.
        if !closed_by_table {
            self.table.leave(&player_id).await;
        }

        res
    }
}
