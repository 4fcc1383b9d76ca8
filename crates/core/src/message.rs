// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Player requests and per-viewer table snapshots.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    poker::{Card, Chips, HandValue, PlayerId},
    state::{Street, TableState},
};

/// The first frame a client sends to identify itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    /// The player identity, trusted as sent.
    pub username: String,
}

/// A request submitted by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Sit at the table with a buy-in from the ledger.
    Join {
        /// Chips to bring to the table.
        amount: Chips,
        /// The seat to take.
        seat: usize,
    },
    /// Leave the table, the stack goes back to the ledger.
    Leave,
    /// Pass the action without betting.
    Check,
    /// Match the current bet.
    Call,
    /// Raise the street commitment to `amount`.
    Raise {
        /// The total street commitment after the raise.
        amount: Chips,
    },
    /// Abandon the hand.
    Fold,
    /// Ask for a fresh snapshot.
    State,
}

/// The table as one viewer is allowed to see it.
///
/// Maps are ordered so snapshots serialize deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The table seats, empty or the seated player.
    pub seats: Vec<Option<PlayerId>>,
    /// Stack of each seated player.
    pub stacks: BTreeMap<PlayerId, Chips>,
    /// The stake unit.
    pub big_blind: Chips,
    /// The street being bet, unset between hands.
    pub street: Option<Street>,
    /// Players contesting the pot, in action order.
    pub positions: Vec<PlayerId>,
    /// Community cards dealt so far.
    pub community_cards: Vec<Card>,
    /// Chips collected from completed streets.
    pub pot: Chips,
    /// Hole cards the viewer may see.
    pub hole_cards: BTreeMap<PlayerId, [Card; 2]>,
    /// Hand evaluations the viewer may see.
    pub hands: BTreeMap<PlayerId, HandValue>,
    /// Chips committed this street per player.
    pub chips_out: BTreeMap<PlayerId, Chips>,
    /// Label of each player's last action this street.
    pub last_action: BTreeMap<PlayerId, String>,
    /// Chips to call this street.
    pub bet_size: Chips,
    /// Seconds the action player has left.
    pub timer: u32,
    /// The player to act, unset between hands.
    pub action_player: Option<PlayerId>,
    /// Hole cards are public at showdown.
    pub reveal: bool,
    /// One-shot note for the viewer, rejections and payouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Snapshot {
    /// Builds the view of the table the given player is allowed to see.
    ///
    /// Hole cards and evaluations are the viewer's own until showdown;
    /// at showdown the contesting players' cards go out to everybody.
    pub fn of(table: &TableState, viewer: &PlayerId) -> Self {
        let mut snapshot = Self {
            seats: table.seats.clone(),
            stacks: table
                .stacks
                .iter()
                .map(|(p, c)| (p.clone(), *c))
                .collect(),
            big_blind: table.big_blind,
            ..Self::default()
        };

        let Some(hand) = &table.hand else {
            return snapshot;
        };

        snapshot.street = Some(hand.round.street);
        snapshot.positions = hand.positions.clone();
        snapshot.community_cards = hand.community_cards.clone();
        snapshot.pot = hand.pot;
        snapshot.chips_out = hand
            .round
            .chips_out
            .iter()
            .map(|(p, c)| (p.clone(), *c))
            .collect();
        snapshot.last_action = hand
            .round
            .last_action
            .iter()
            .map(|(p, a)| (p.clone(), a.clone()))
            .collect();
        snapshot.bet_size = hand.turn.bet_size;
        snapshot.timer = hand.turn.timer;
        snapshot.action_player = Some(hand.action_player_id().clone());
        snapshot.reveal = hand.reveal;

        if hand.reveal {
            for player in &hand.positions {
                if let Some(cards) = hand.hole_cards.get(player) {
                    snapshot.hole_cards.insert(player.clone(), *cards);
                }
                if let Some(value) = hand.hands.get(player) {
                    snapshot.hands.insert(player.clone(), *value);
                }
            }
        } else {
            if let Some(cards) = hand.hole_cards.get(viewer) {
                snapshot.hole_cards.insert(viewer.clone(), *cards);
            }
            if let Some(value) = hand.hands.get(viewer) {
                snapshot.hands.insert(viewer.clone(), *value);
            }
        }

        snapshot
    }

    /// Attaches a one-shot note for the viewer.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
