// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Game error taxonomy.
//!
//! Rule violations are rejected at the point of submission and never
//! propagate into the engine loop, the error text is what the submitting
//! player sees.
use thiserror::Error;

/// A betting rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    /// No hand is running.
    #[error("no hand in progress")]
    NoHand,
    /// The submitter is not the action player.
    #[error("not your turn")]
    OutOfTurn,
    /// Check submitted while facing a bet.
    #[error("cannot check facing a bet")]
    CannotCheck,
    /// Call submitted with nothing to call.
    #[error("nothing to call")]
    NothingToCall,
    /// Raise that does not exceed the current bet.
    #[error("raise must exceed the current bet")]
    RaiseTooSmall,
    /// The player stack does not cover the action.
    #[error("not enough chips")]
    InsufficientStack,
}

/// A seating or resource failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// Seat index out of range.
    #[error("invalid seat")]
    InvalidSeat,
    /// The requested seat is occupied.
    #[error("seat taken")]
    SeatTaken,
    /// The player already sits at the table.
    #[error("already joined")]
    AlreadySeated,
    /// The player does not sit at the table.
    #[error("not in game")]
    NotSeated,
    /// The player has no ledger record.
    #[error("player not found")]
    NotFound,
    /// The ledger balance does not cover the buy-in.
    #[error("insufficient funds")]
    InsufficientFunds,
}
