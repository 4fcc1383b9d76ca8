// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Table state types.
//!
//! [TableState] is the single owned aggregate for a table: seats and stacks
//! persist across hands, the [Hand], with its [Round] and [Turn], lives from
//! deal to pot distribution. Only the session engine mutates these types,
//! every other context sees read-only snapshots.
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ActionError, TableError},
    poker::{Card, Chips, HandValue, PlayerId},
};

/// Number of seats at the table.
pub const SEATS: usize = 9;

/// A betting street.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    /// Before the flop.
    Preflop,
    /// First three community cards.
    Flop,
    /// Fourth community card.
    Turn,
    /// Fifth community card.
    River,
}

/// State that persists across hands: seats, stacks, stakes.
#[derive(Debug)]
pub struct TableState {
    /// The table seats, each empty or holding one seated player.
    pub seats: Vec<Option<PlayerId>>,
    /// Chips each seated player has behind.
    pub stacks: AHashMap<PlayerId, Chips>,
    /// The stake unit, the small blind is half of it.
    pub big_blind: Chips,
    /// The hand being played, if any.
    pub hand: Option<Hand>,
}

impl TableState {
    /// Creates an empty table with the given stake.
    pub fn new(big_blind: Chips) -> Self {
        Self {
            seats: vec![None; SEATS],
            stacks: AHashMap::default(),
            big_blind,
            hand: None,
        }
    }

    /// Checks if the player sits at the table.
    pub fn is_seated(&self, player: &PlayerId) -> bool {
        self.stacks.contains_key(player)
    }

    /// Seats a player with a stack.
    pub fn seat(&mut self, player: &PlayerId, seat: usize, chips: Chips) -> Result<(), TableError> {
        if seat >= self.seats.len() {
            return Err(TableError::InvalidSeat);
        }

        if self.is_seated(player) {
            return Err(TableError::AlreadySeated);
        }

        if self.seats[seat].is_some() {
            return Err(TableError::SeatTaken);
        }

        self.seats[seat] = Some(player.clone());
        self.stacks.insert(player.clone(), chips);

        Ok(())
    }

    /// Removes a player from the table returning their stack.
    pub fn unseat(&mut self, player: &PlayerId) -> Result<Chips, TableError> {
        let chips = self.stacks.remove(player).ok_or(TableError::NotSeated)?;

        for seat in self.seats.iter_mut() {
            if seat.as_ref() == Some(player) {
                *seat = None;
            }
        }

        Ok(chips)
    }

    /// The player's stack, zero if not seated.
    pub fn stack(&self, player: &PlayerId) -> Chips {
        self.stacks.get(player).copied().unwrap_or_default()
    }

    /// Debits a stack, fails without mutating if it does not cover.
    pub fn debit(&mut self, player: &PlayerId, amount: Chips) -> Result<(), ActionError> {
        let stack = self
            .stacks
            .get_mut(player)
            .ok_or(ActionError::InsufficientStack)?;

        if *stack < amount {
            return Err(ActionError::InsufficientStack);
        }

        *stack -= amount;
        Ok(())
    }

    /// Credits a stack.
    pub fn credit(&mut self, player: &PlayerId, amount: Chips) {
        if let Some(stack) = self.stacks.get_mut(player) {
            *stack += amount;
        }
    }

    /// Seated players in seat order whose stack covers the big blind.
    ///
    /// Shorter stacks stay seated but are not dealt in, partial blinds
    /// would need all-in handling.
    pub fn eligible_players(&self) -> Vec<PlayerId> {
        self.seats
            .iter()
            .flatten()
            .filter(|p| self.stack(p) >= self.big_blind)
            .cloned()
            .collect()
    }
}

/// One hand, from deal to pot distribution.
#[derive(Debug)]
pub struct Hand {
    /// Players dealt in, fixed for the hand's lifetime.
    pub starting_positions: Vec<PlayerId>,
    /// Players still contesting the pot, in action order.
    pub positions: Vec<PlayerId>,
    /// Two cards per dealt-in player, set once at the deal.
    pub hole_cards: AHashMap<PlayerId, [Card; 2]>,
    /// Community cards, grows 0, 3, 4, 5 across streets.
    pub community_cards: Vec<Card>,
    /// Chips collected from completed streets.
    pub pot: Chips,
    /// Best evaluation per player, recomputed after each street.
    pub hands: AHashMap<PlayerId, HandValue>,
    /// The current betting round.
    pub round: Round,
    /// The current turn.
    pub turn: Turn,
    /// Hole cards are public at showdown.
    pub reveal: bool,
}

/// One betting round within a hand.
#[derive(Debug)]
pub struct Round {
    /// The street being bet.
    pub street: Street,
    /// Chips committed by each player this street.
    pub chips_out: AHashMap<PlayerId, Chips>,
    /// Label of each player's last action this street.
    pub last_action: AHashMap<PlayerId, String>,
    /// Index into positions of the player who closes the betting.
    pub last_bet_player: usize,
    /// The round is closed, pending the street advance.
    pub over: bool,
}

/// The turn within a betting round.
#[derive(Debug)]
pub struct Turn {
    /// Index into positions of the player to act.
    pub action_player: usize,
    /// Chips to call this street.
    pub bet_size: Chips,
    /// Seconds left to act.
    pub timer: u32,
}

impl Hand {
    /// Starts a hand for the given players, in action order.
    pub fn new(positions: Vec<PlayerId>, turn_time: u32) -> Self {
        let first_to_act = 2 % positions.len();

        Self {
            starting_positions: positions.clone(),
            positions,
            hole_cards: AHashMap::default(),
            community_cards: Vec::new(),
            pot: Chips::ZERO,
            hands: AHashMap::default(),
            round: Round {
                street: Street::Preflop,
                chips_out: AHashMap::default(),
                last_action: AHashMap::default(),
                last_bet_player: first_to_act,
                over: false,
            },
            turn: Turn {
                action_player: first_to_act,
                bet_size: Chips::ZERO,
                timer: turn_time,
            },
            reveal: false,
        }
    }

    /// Computes a new hand's action order from the previous hand's order.
    ///
    /// The order is the eligible seating rotated to start at the first
    /// survivor found scanning the previous order from its second entry,
    /// which moves the button to the next occupied seat. Falls back to
    /// plain seating order when nobody from the previous hand remains.
    pub fn rotate_positions(prev: &[PlayerId], seated: &[PlayerId]) -> Vec<PlayerId> {
        for player in prev.iter().cycle().skip(1).take(prev.len()) {
            if let Some(idx) = seated.iter().position(|s| s == player) {
                let mut positions = seated[idx..].to_vec();
                positions.extend_from_slice(&seated[..idx]);
                return positions;
            }
        }

        seated.to_vec()
    }

    /// The player whose turn it is.
    pub fn action_player_id(&self) -> &PlayerId {
        &self.positions[self.turn.action_player]
    }

    /// Chips the player has committed this street.
    pub fn committed(&self, player: &PlayerId) -> Chips {
        self.round
            .chips_out
            .get(player)
            .copied()
            .unwrap_or_default()
    }

    /// Commits chips for the player this street.
    pub fn commit(&mut self, player: &PlayerId, amount: Chips) {
        *self
            .round
            .chips_out
            .entry(player.clone())
            .or_default() += amount;
    }

    /// Records the label of the player's last action this street.
    pub fn note_action(&mut self, player: &PlayerId, label: impl Into<String>) {
        self.round.last_action.insert(player.clone(), label.into());
    }

    /// The index acting after the current action player.
    fn next_index(&self) -> usize {
        (self.turn.action_player + 1) % self.positions.len()
    }

    /// Moves the turn after a check, call, bet or raise.
    ///
    /// Closes the round when the action returns to the closing player.
    pub fn advance_action(&mut self) {
        if self.next_index() == self.round.last_bet_player {
            self.round.over = true;
        } else {
            self.turn.action_player = self.next_index();
        }
    }

    /// Removes the player at `idx` from the contest, repairing the action
    /// and closing indices so they never index out of the shrunk order.
    pub fn fold_out(&mut self, idx: usize) {
        // The close check uses pre-removal indices; with two players left
        // the fold ends the betting outright.
        let closes = idx == self.turn.action_player
            && (self.next_index() == self.round.last_bet_player || self.positions.len() == 2);

        self.positions.remove(idx);

        if idx < self.round.last_bet_player {
            self.round.last_bet_player -= 1;
        }
        self.round.last_bet_player %= self.positions.len().max(1);

        if idx < self.turn.action_player {
            self.turn.action_player -= 1;
        }
        self.turn.action_player %= self.positions.len().max(1);

        if closes {
            self.round.over = true;
        }
    }

    /// Rolls the street bets into the pot and clears the round fields for
    /// the next street.
    pub fn collect_bets(&mut self, turn_time: u32) {
        for (_, chips) in self.round.chips_out.drain() {
            self.pot += chips;
        }

        self.round.last_action.clear();
        self.round.last_bet_player = 0;
        self.round.over = false;
        self.turn.action_player = 0;
        self.turn.bet_size = Chips::ZERO;
        self.turn.timer = turn_time;
    }

    /// Splits the pot equally between the winners, in contest order.
    ///
    /// The pot is zeroed; the integer-division remainder goes to the first
    /// winner so no chips are lost.
    pub fn split_pot(&mut self, winners: &[PlayerId]) -> Vec<(PlayerId, Chips)> {
        assert!(!winners.is_empty(), "split_pot requires a winner");

        let share = self.pot / winners.len() as u32;
        let remainder = self.pot % winners.len() as u32;
        self.pot = Chips::ZERO;

        winners
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let chips = if i == 0 { share + remainder } else { share };
                (p.clone(), chips)
            })
            .collect()
    }
}
