// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Table session engine.
//!
//! Owns the table state and drives hands from blinds to payout. All
//! mutations happen on the table task, connections see the results as
//! redacted snapshots.
use ahash::AHashMap;
use log::{error, info};
use rand::{SeedableRng, rngs::StdRng};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use riverboat_core::{
    error::ActionError,
    message::{Action, Snapshot},
    poker::{Chips, Deck, HandValue, PlayerId, TableId},
    state::{Hand, Street, TableState},
};

use crate::ledger::{Ledger, LedgerError};

use super::TableMessage;

/// Internal table state.
#[derive(Debug)]
pub struct State {
    table_id: TableId,
    /// Seconds a player has to act.
    turn_time: u32,
    table: TableState,
    deck: Deck,
    /// Channels to the connections of seated players.
    viewers: AHashMap<PlayerId, mpsc::Sender<TableMessage>>,
    /// Action order of the last started hand, drives button rotation.
    last_positions: Vec<PlayerId>,
    /// When the action player folds for inactivity.
    turn_deadline: Option<Instant>,
    /// When the next hand starts.
    hand_start_at: Option<Instant>,
    ledger: Ledger,
    rng: StdRng,
}

impl State {
    /// Ledger balance given to a player on their first join.
    const DEFAULT_CHIPS: Chips = Chips::new(10_000);
    /// Pause between the end of a hand and the next deal.
    const NEW_HAND_DELAY: Duration = Duration::from_secs(5);

    /// Create a new state.
    pub fn new(table_id: TableId, big_blind: Chips, turn_time: u32, ledger: Ledger) -> Self {
        Self::with_rng(table_id, big_blind, turn_time, ledger, StdRng::from_os_rng())
    }

    /// Create a new state with user initialized randomness.
    fn with_rng(
        table_id: TableId,
        big_blind: Chips,
        turn_time: u32,
        ledger: Ledger,
        mut rng: StdRng,
    ) -> Self {
        Self {
            table_id,
            turn_time,
            table: TableState::new(big_blind),
            deck: Deck::new_and_shuffled(&mut rng),
            viewers: AHashMap::default(),
            last_positions: Vec::default(),
            turn_deadline: None,
            hand_start_at: None,
            ledger,
            rng,
        }
    }

    /// A player tries to join the table.
    ///
    /// The buy-in comes out of the ledger, a first join creates the
    /// account with the default balance. On a refused join the player
    /// gets the reason, and the connection is closed unless they
    /// already hold a seat.
    pub async fn join(
        &mut self,
        player_id: &PlayerId,
        seat: usize,
        amount: Chips,
        table_tx: mpsc::Sender<TableMessage>,
    ) {
        let res = self
            .ledger
            .withdraw(player_id, amount, Self::DEFAULT_CHIPS)
            .await;

        if let Err(err) = res {
            if !matches!(err, LedgerError::InsufficientFunds) {
                error!(
                    "Table {} ledger withdraw for {player_id} failed: {err}",
                    self.table_id
                );
            }

            Self::refuse(&table_tx, &self.table, player_id, &err.to_string()).await;
            return;
        }

        if let Err(err) = self.table.seat(player_id, seat, amount) {
            if let Err(refund_err) = self.ledger.deposit(player_id, amount).await {
                error!(
                    "Table {} ledger refund for {player_id} failed: {refund_err}",
                    self.table_id
                );
            }

            // A player who already holds a seat only gets the reason,
            // closing their connection would strand the seat.
            if self.table.is_seated(player_id) {
                let snapshot =
                    Snapshot::of(&self.table, player_id).with_message(err.to_string());
                let _ = table_tx.send(TableMessage::Send(snapshot)).await;
            } else {
                Self::refuse(&table_tx, &self.table, player_id, &err.to_string()).await;
            }
            return;
        }

        info!(
            "Table {} {player_id} joined seat {seat} with {amount}",
            self.table_id
        );

        self.viewers.insert(player_id.clone(), table_tx);
        self.schedule_hand();
        self.notify_all().await;
    }

    /// A player leaves the table.
    ///
    /// A leaver in a running hand is folded out, their bets stay in the
    /// pot and their stack goes back to the ledger.
    pub async fn leave(&mut self, player_id: &PlayerId) {
        if !self.table.is_seated(player_id) {
            return;
        }

        // Settle the ledger first so a failure leaves the table untouched.
        let stack = self.table.stack(player_id);
        if stack > Chips::ZERO {
            if let Err(err) = self.ledger.deposit(player_id, stack).await {
                error!(
                    "Table {} ledger deposit for {player_id} failed: {err}",
                    self.table_id
                );
                self.notify_one(player_id, Some(err.to_string())).await;
                return;
            }
        }

        let mut folded_out = false;
        if let Some(hand) = &mut self.table.hand {
            if let Some(idx) = hand.positions.iter().position(|p| p == player_id) {
                // The next player gets a fresh turn when the leaver was
                // the one to act.
                if idx == hand.turn.action_player {
                    self.turn_deadline = None;
                }

                hand.note_action(player_id, "fold");
                hand.fold_out(idx);
                folded_out = true;
            }
        }

        let _ = self.table.unseat(player_id);

        if let Some(tx) = self.viewers.remove(player_id) {
            let _ = tx.send(TableMessage::Close).await;
        }

        info!("Table {} {player_id} left", self.table_id);

        if folded_out {
            self.resolve().await;
        } else {
            self.notify_all().await;
        }

        if self.table.eligible_players().len() < 2 {
            self.hand_start_at = None;
        }
    }

    /// Handle an action from a player.
    ///
    /// Rule violations go back to the submitter only and leave the table
    /// untouched.
    pub async fn action(&mut self, player_id: &PlayerId, action: Action) {
        if !self.viewers.contains_key(player_id) {
            return;
        }

        match action {
            Action::State => self.notify_one(player_id, None).await,
            // Routed by the connection handler.
            Action::Join { .. } | Action::Leave => {}
            action => {
                if let Err(err) = self.play(player_id, &action) {
                    info!("Table {} rejected {player_id}: {err}", self.table_id);
                    self.notify_one(player_id, Some(err.to_string())).await;
                } else {
                    self.turn_deadline = None;
                    self.resolve().await;
                }
            }
        }
    }

    /// Drives the hand start delay and the turn timeout.
    pub async fn tick(&mut self) {
        if let Some(at) = self.hand_start_at {
            if Instant::now() >= at {
                self.hand_start_at = None;
                self.start_hand().await;
                return;
            }
        }

        let Some(deadline) = self.turn_deadline else {
            return;
        };

        let now = Instant::now();
        if now >= deadline {
            // The action player ran out of time, fold them out. A late
            // action finds its player out of turn and is rejected.
            self.turn_deadline = None;

            if let Some(hand) = &mut self.table.hand {
                let idx = hand.turn.action_player;
                let player_id = hand.positions[idx].clone();
                hand.note_action(&player_id, "fold");
                hand.fold_out(idx);

                info!("Table {} {player_id} folded on timeout", self.table_id);
            }

            self.resolve().await;
        } else {
            let remaining = deadline.duration_since(now).as_secs() as u32;

            let mut changed = false;
            if let Some(hand) = &mut self.table.hand {
                if hand.turn.timer != remaining {
                    hand.turn.timer = remaining;
                    changed = true;
                }
            }

            if changed {
                self.notify_all().await;
            }
        }
    }

    /// Validates and applies a betting action.
    fn play(&mut self, player_id: &PlayerId, action: &Action) -> Result<(), ActionError> {
        let hand = self.table.hand.as_mut().ok_or(ActionError::NoHand)?;

        if hand.action_player_id() != player_id {
            return Err(ActionError::OutOfTurn);
        }

        let committed = hand.committed(player_id);
        let bet_size = hand.turn.bet_size;

        match action {
            Action::Check => {
                if committed != bet_size {
                    return Err(ActionError::CannotCheck);
                }

                hand.note_action(player_id, "check");
                hand.advance_action();
            }
            Action::Call => {
                if bet_size <= committed {
                    return Err(ActionError::NothingToCall);
                }

                let amount = bet_size - committed;
                let stack = self
                    .table
                    .stacks
                    .get_mut(player_id)
                    .ok_or(ActionError::InsufficientStack)?;
                if *stack < amount {
                    return Err(ActionError::InsufficientStack);
                }

                *stack -= amount;
                hand.commit(player_id, amount);
                hand.note_action(player_id, "call");
                hand.advance_action();
            }
            Action::Raise { amount } => {
                // The amount is the total street commitment after the raise.
                if *amount <= bet_size {
                    return Err(ActionError::RaiseTooSmall);
                }

                let delta = *amount - committed;
                let stack = self
                    .table
                    .stacks
                    .get_mut(player_id)
                    .ok_or(ActionError::InsufficientStack)?;
                if *stack < delta {
                    return Err(ActionError::InsufficientStack);
                }

                *stack -= delta;
                hand.commit(player_id, delta);
                hand.turn.bet_size = *amount;
                hand.round.last_bet_player = hand.turn.action_player;
                hand.note_action(player_id, format!("bet {amount}"));
                hand.advance_action();
            }
            Action::Fold => {
                let idx = hand.turn.action_player;
                hand.note_action(player_id, "fold");
                hand.fold_out(idx);
            }
            _ => {}
        }

        Ok(())
    }

    /// Moves the hand forward after a state change.
    async fn resolve(&mut self) {
        let Some(hand) = &mut self.table.hand else {
            return;
        };

        if hand.positions.len() == 1 {
            // Everybody else folded, sweep the street bets and pay the
            // last player standing.
            hand.collect_bets(self.turn_time);
            let winner = hand.positions[0].clone();
            let payouts = hand.split_pot(&[winner]);
            self.end_hand(payouts).await;
        } else if hand.round.over {
            self.advance_street().await;
        } else {
            if self.turn_deadline.is_none() {
                self.arm_turn();
            }
            self.notify_all().await;
        }
    }

    /// Starts a hand if at least two seated players cover the big blind.
    async fn start_hand(&mut self) {
        let eligible = self.table.eligible_players();
        if eligible.len() < 2 {
            return;
        }

        let positions = Hand::rotate_positions(&self.last_positions, &eligible);
        self.last_positions = positions.clone();

        let mut hand = Hand::new(positions, self.turn_time);

        // Post the blinds, eligibility guarantees the stacks cover them.
        let small_blind = self.table.big_blind / 2;
        let big_blind = self.table.big_blind;

        let sb_player = hand.positions[0].clone();
        let _ = self.table.debit(&sb_player, small_blind);
        hand.commit(&sb_player, small_blind);
        hand.note_action(&sb_player, "smallblind");

        let bb_player = hand.positions[1].clone();
        let _ = self.table.debit(&bb_player, big_blind);
        hand.commit(&bb_player, big_blind);
        hand.note_action(&bb_player, "bigblind");

        hand.turn.bet_size = big_blind;

        self.deck = Deck::new_and_shuffled(&mut self.rng);
        for player_id in hand.positions.clone() {
            let cards = [self.deck.deal(), self.deck.deal()];
            hand.hole_cards.insert(player_id, cards);
        }

        info!(
            "Table {} hand started with {} players",
            self.table_id,
            hand.positions.len()
        );

        self.table.hand = Some(hand);
        self.arm_turn();
        self.notify_all().await;
    }

    /// Closes the street and deals the next one, or runs the showdown
    /// after the river.
    async fn advance_street(&mut self) {
        let showdown = {
            let Some(hand) = &mut self.table.hand else {
                return;
            };

            hand.collect_bets(self.turn_time);

            match hand.round.street {
                Street::Preflop => {
                    for _ in 0..3 {
                        hand.community_cards.push(self.deck.deal());
                    }
                    hand.round.street = Street::Flop;
                    false
                }
                Street::Flop => {
                    hand.community_cards.push(self.deck.deal());
                    hand.round.street = Street::Turn;
                    false
                }
                Street::Turn => {
                    hand.community_cards.push(self.deck.deal());
                    hand.round.street = Street::River;
                    false
                }
                Street::River => true,
            }
        };

        if showdown {
            self.showdown().await;
        } else {
            self.update_hand_values();
            self.arm_turn();
            self.notify_all().await;
        }
    }

    /// Reveals the contested hands and splits the pot between the best.
    async fn showdown(&mut self) {
        let payouts = {
            let Some(hand) = &mut self.table.hand else {
                return;
            };

            hand.reveal = true;

            let best = hand
                .positions
                .iter()
                .filter_map(|p| hand.hands.get(p))
                .max()
                .copied();
            let Some(best) = best else {
                return;
            };

            let winners = hand
                .positions
                .iter()
                .filter(|p| hand.hands.get(*p) == Some(&best))
                .cloned()
                .collect::<Vec<_>>();

            hand.split_pot(&winners)
        };

        self.end_hand(payouts).await;
    }

    /// Credits the payouts, notifies the result and schedules the next
    /// hand.
    async fn end_hand(&mut self, payouts: Vec<(PlayerId, Chips)>) {
        let message = payouts
            .iter()
            .map(|(p, c)| format!("{p} wins {c}"))
            .collect::<Vec<_>>()
            .join(", ");

        for (player_id, chips) in &payouts {
            self.table.credit(player_id, *chips);
        }

        info!("Table {} {message}", self.table_id);

        self.turn_deadline = None;
        self.notify_all_message(&message).await;

        self.table.hand = None;
        self.schedule_hand();
    }

    /// Recomputes the best hand of each contesting player.
    fn update_hand_values(&mut self) {
        let Some(hand) = &mut self.table.hand else {
            return;
        };

        for player_id in hand.positions.clone() {
            if let Some(hole) = hand.hole_cards.get(&player_id).copied() {
                let mut cards = hole.to_vec();
                cards.extend_from_slice(&hand.community_cards);
                hand.hands.insert(player_id, HandValue::eval(&cards));
            }
        }
    }

    /// Gives the action player the full time to act.
    fn arm_turn(&mut self) {
        if let Some(hand) = &mut self.table.hand {
            hand.turn.timer = self.turn_time;
            self.turn_deadline =
                Some(Instant::now() + Duration::from_secs(self.turn_time as u64));
        }
    }

    /// Schedules the next hand if enough players can play one.
    fn schedule_hand(&mut self) {
        if self.table.hand.is_none()
            && self.hand_start_at.is_none()
            && self.table.eligible_players().len() >= 2
        {
            self.hand_start_at = Some(Instant::now() + Self::NEW_HAND_DELAY);
        }
    }

    /// Sends every viewer their snapshot of the table.
    async fn notify_all(&self) {
        for (viewer, tx) in &self.viewers {
            let snapshot = Snapshot::of(&self.table, viewer);
            let _ = tx.send(TableMessage::Send(snapshot)).await;
        }
    }

    /// Sends every viewer their snapshot with a note attached.
    async fn notify_all_message(&self, message: &str) {
        for (viewer, tx) in &self.viewers {
            let snapshot = Snapshot::of(&self.table, viewer).with_message(message);
            let _ = tx.send(TableMessage::Send(snapshot)).await;
        }
    }

    /// Sends one viewer their snapshot of the table.
    async fn notify_one(&self, viewer: &PlayerId, message: Option<String>) {
        if let Some(tx) = self.viewers.get(viewer) {
            let mut snapshot = Snapshot::of(&self.table, viewer);
            if let Some(message) = message {
                snapshot = snapshot.with_message(message);
            }

            let _ = tx.send(TableMessage::Send(snapshot)).await;
        }
    }

    /// Sends a refused player the reason and closes their connection.
    async fn refuse(
        table_tx: &mpsc::Sender<TableMessage>,
        table: &TableState,
        player_id: &PlayerId,
        reason: &str,
    ) {
        let snapshot = Snapshot::of(table, player_id).with_message(reason);
        let _ = table_tx.send(TableMessage::Send(snapshot)).await;
        let _ = table_tx.send(TableMessage::Close).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOIN_CHIPS: Chips = Chips::new(1_000);

    /// Creates a `State` with seeded randomness and memory ledger.
    fn new_state() -> State {
        let rng = StdRng::seed_from_u64(13);
        let ledger = Ledger::open_in_memory().unwrap();
        State::with_rng(TableId::new_id(), Chips::new(100), 20, ledger, rng)
    }

    async fn join_player(
        state: &mut State,
        name: &str,
        seat: usize,
    ) -> (PlayerId, mpsc::Receiver<TableMessage>) {
        let player_id = PlayerId::from(name);
        let (table_tx, table_rx) = mpsc::channel(64);
        state.join(&player_id, seat, JOIN_CHIPS, table_tx).await;
        (player_id, table_rx)
    }

    /// Drains a connection channel and returns the last snapshot.
    fn last_snapshot(rx: &mut mpsc::Receiver<TableMessage>) -> Snapshot {
        let mut last = None;
        while let Ok(msg) = rx.try_recv() {
            if let TableMessage::Send(snapshot) = msg {
                last = Some(snapshot);
            }
        }
        last.expect("no snapshot")
    }

    /// Skips the inter-hand delay and deals the next hand.
    async fn start_hand(state: &mut State) {
        state.hand_start_at = Some(Instant::now());
        state.tick().await;
    }

    #[tokio::test]
    async fn hand_starts_with_blinds_posted() {
        let mut state = new_state();
        let (alice, mut rx1) = join_player(&mut state, "alice", 0).await;
        let (_bob, _rx2) = join_player(&mut state, "bob", 1).await;
        let (_carol, _rx3) = join_player(&mut state, "carol", 2).await;

        // The hand is scheduled, not started.
        assert!(state.table.hand.is_none());
        assert!(state.hand_start_at.is_some());

        start_hand(&mut state).await;

        let snapshot = last_snapshot(&mut rx1);
        assert_eq!(snapshot.street, Some(Street::Preflop));
        assert_eq!(snapshot.positions.len(), 3);
        assert_eq!(snapshot.bet_size, Chips::new(100));
        assert_eq!(snapshot.timer, 20);

        // Blinds out of the first two positions, action on the third.
        let sb = &snapshot.positions[0];
        let bb = &snapshot.positions[1];
        assert_eq!(snapshot.chips_out.get(sb), Some(&Chips::new(50)));
        assert_eq!(snapshot.chips_out.get(bb), Some(&Chips::new(100)));
        assert_eq!(snapshot.last_action.get(sb).map(String::as_str), Some("smallblind"));
        assert_eq!(snapshot.last_action.get(bb).map(String::as_str), Some("bigblind"));
        assert_eq!(snapshot.action_player.as_ref(), Some(&snapshot.positions[2]));

        // Each viewer sees their own hole cards only.
        assert_eq!(snapshot.hole_cards.len(), 1);
        assert!(snapshot.hole_cards.contains_key(&alice));
        assert!(!snapshot.reveal);
    }

    #[tokio::test]
    async fn calls_and_checks_reach_the_flop() {
        let mut state = new_state();
        let (alice, mut rx1) = join_player(&mut state, "alice", 0).await;
        let (bob, mut rx2) = join_player(&mut state, "bob", 1).await;
        let (carol, _rx3) = join_player(&mut state, "carol", 2).await;
        start_hand(&mut state).await;

        // First hand positions follow the seating, action on carol.
        state.action(&carol, Action::Call).await;
        state.action(&alice, Action::Call).await;

        let snapshot = last_snapshot(&mut rx1);
        assert_eq!(snapshot.street, Some(Street::Preflop));
        assert_eq!(snapshot.action_player, Some(bob.clone()));

        // The big blind checks their option and the flop comes out.
        state.action(&bob, Action::Check).await;

        let snapshot = last_snapshot(&mut rx2);
        assert_eq!(snapshot.street, Some(Street::Flop));
        assert_eq!(snapshot.pot, Chips::new(300));
        assert_eq!(snapshot.community_cards.len(), 3);
        assert_eq!(snapshot.bet_size, Chips::ZERO);
        assert!(snapshot.chips_out.is_empty());
        assert_eq!(snapshot.stacks.get(&alice), Some(&Chips::new(900)));

        // Postflop the action starts from the first position, and each
        // player now sees their own evaluation.
        assert_eq!(snapshot.action_player, Some(alice.clone()));
        assert_eq!(snapshot.hands.len(), 1);
        assert!(snapshot.hands.contains_key(&bob));
    }

    #[tokio::test]
    async fn illegal_actions_are_rejected() {
        let mut state = new_state();
        let (alice, mut rx1) = join_player(&mut state, "alice", 0).await;
        let (_bob, mut rx2) = join_player(&mut state, "bob", 1).await;
        let (carol, mut rx3) = join_player(&mut state, "carol", 2).await;
        start_hand(&mut state).await;
        last_snapshot(&mut rx2);

        // Out of turn submission goes back to the submitter only.
        state.action(&alice, Action::Call).await;
        let snapshot = last_snapshot(&mut rx1);
        assert_eq!(snapshot.message.as_deref(), Some("not your turn"));
        assert_eq!(snapshot.action_player, Some(carol.clone()));
        assert!(rx2.try_recv().is_err());

        state.action(&carol, Action::Check).await;
        let snapshot = last_snapshot(&mut rx3);
        assert_eq!(snapshot.message.as_deref(), Some("cannot check facing a bet"));

        state
            .action(&carol, Action::Raise { amount: Chips::new(100) })
            .await;
        let snapshot = last_snapshot(&mut rx3);
        assert_eq!(
            snapshot.message.as_deref(),
            Some("raise must exceed the current bet")
        );

        state
            .action(&carol, Action::Raise { amount: Chips::new(2_000) })
            .await;
        let snapshot = last_snapshot(&mut rx3);
        assert_eq!(snapshot.message.as_deref(), Some("not enough chips"));

        // The rejections left the hand untouched.
        assert_eq!(snapshot.pot, Chips::ZERO);
        assert_eq!(snapshot.action_player, Some(carol));
    }

    #[tokio::test]
    async fn folds_award_the_pot_to_the_last_standing() {
        let mut state = new_state();
        let (alice, _rx1) = join_player(&mut state, "alice", 0).await;
        let (bob, mut rx2) = join_player(&mut state, "bob", 1).await;
        let (carol, _rx3) = join_player(&mut state, "carol", 2).await;
        start_hand(&mut state).await;

        state.action(&carol, Action::Fold).await;
        state.action(&alice, Action::Fold).await;

        // The big blind takes the blinds without a showdown.
        let snapshot = last_snapshot(&mut rx2);
        assert!(state.table.hand.is_none());
        assert_eq!(snapshot.message.as_deref(), Some("bob wins 150"));
        assert_eq!(snapshot.stacks.get(&bob), Some(&Chips::new(1_050)));
        assert_eq!(snapshot.stacks.get(&alice), Some(&Chips::new(950)));
        assert_eq!(snapshot.stacks.get(&carol), Some(&Chips::new(1_000)));
        assert!(state.hand_start_at.is_some());
    }

    #[tokio::test]
    async fn raise_reopens_the_betting() {
        let mut state = new_state();
        let (alice, mut rx1) = join_player(&mut state, "alice", 0).await;
        let (bob, mut rx2) = join_player(&mut state, "bob", 1).await;
        let (carol, _rx3) = join_player(&mut state, "carol", 2).await;
        start_hand(&mut state).await;

        state
            .action(&carol, Action::Raise { amount: Chips::new(300) })
            .await;

        let snapshot = last_snapshot(&mut rx1);
        assert_eq!(snapshot.bet_size, Chips::new(300));
        assert_eq!(
            snapshot.last_action.get(&carol).map(String::as_str),
            Some("bet 300")
        );
        assert_eq!(snapshot.action_player, Some(alice.clone()));

        state.action(&alice, Action::Fold).await;
        state.action(&bob, Action::Call).await;

        // The raiser does not act again once everybody matched.
        let snapshot = last_snapshot(&mut rx2);
        assert_eq!(snapshot.street, Some(Street::Flop));
        assert_eq!(snapshot.pot, Chips::new(650));
        assert_eq!(snapshot.stacks.get(&bob), Some(&Chips::new(700)));
    }

    #[tokio::test]
    async fn timeout_folds_the_action_player() {
        let mut state = new_state();
        let (_alice, mut rx1) = join_player(&mut state, "alice", 0).await;
        let (_bob, _rx2) = join_player(&mut state, "bob", 1).await;
        let (carol, mut rx3) = join_player(&mut state, "carol", 2).await;
        start_hand(&mut state).await;

        state.turn_deadline = Some(Instant::now());
        state.tick().await;

        let snapshot = last_snapshot(&mut rx1);
        assert_eq!(snapshot.positions.len(), 2);
        assert!(!snapshot.positions.contains(&carol));
        assert_eq!(
            snapshot.last_action.get(&carol).map(String::as_str),
            Some("fold")
        );

        // A late action from the folded player is a no-op.
        last_snapshot(&mut rx3);
        state.action(&carol, Action::Call).await;
        let snapshot = last_snapshot(&mut rx3);
        assert_eq!(snapshot.message.as_deref(), Some("not your turn"));
        assert_eq!(snapshot.positions.len(), 2);
    }

    #[tokio::test]
    async fn leaver_is_folded_out_and_cashed_out() {
        let mut state = new_state();
        let (alice, mut rx1) = join_player(&mut state, "alice", 0).await;
        let (bob, mut rx2) = join_player(&mut state, "bob", 1).await;
        let (carol, _rx3) = join_player(&mut state, "carol", 2).await;
        start_hand(&mut state).await;

        state.action(&carol, Action::Call).await;
        state.leave(&alice).await;

        // The leaver is out of the hand, their blind stays in play.
        let snapshot = last_snapshot(&mut rx2);
        assert!(!snapshot.positions.contains(&alice));
        assert!(snapshot.stacks.get(&alice).is_none());
        assert!(snapshot.seats.iter().all(|s| s.as_ref() != Some(&alice)));
        assert_eq!(snapshot.action_player, Some(bob.clone()));

        // Their stack went back to the ledger, minus the posted blind.
        assert_eq!(
            state.ledger.balance(&alice).await.unwrap(),
            Chips::new(9_950)
        );

        let mut closed = false;
        while let Ok(msg) = rx1.try_recv() {
            closed |= matches!(msg, TableMessage::Close);
        }
        assert!(closed);

        // The big blind closes the round with the leaver's chips in it.
        state.action(&bob, Action::Check).await;
        let snapshot = last_snapshot(&mut rx2);
        assert_eq!(snapshot.street, Some(Street::Flop));
        assert_eq!(snapshot.pot, Chips::new(250));
    }

    #[tokio::test]
    async fn checked_down_hand_reaches_showdown() {
        let mut state = new_state();
        let (alice, mut rx1) = join_player(&mut state, "alice", 0).await;
        let (bob, mut rx2) = join_player(&mut state, "bob", 1).await;
        let (carol, _rx3) = join_player(&mut state, "carol", 2).await;
        start_hand(&mut state).await;

        state.action(&carol, Action::Call).await;
        state.action(&alice, Action::Call).await;
        state.action(&bob, Action::Check).await;

        // Check down the flop, turn and river.
        for _ in 0..3 {
            state.action(&alice, Action::Check).await;
            state.action(&bob, Action::Check).await;
            state.action(&carol, Action::Check).await;
        }

        let snapshot = last_snapshot(&mut rx1);
        assert!(state.table.hand.is_none());
        assert!(snapshot.reveal);
        assert_eq!(snapshot.community_cards.len(), 5);
        assert_eq!(snapshot.hole_cards.len(), 3);
        assert_eq!(snapshot.hands.len(), 3);
        assert_eq!(snapshot.pot, Chips::ZERO);
        assert!(snapshot.message.as_deref().unwrap().contains("wins"));

        // Everybody sees the same revealed cards, and no chips leaked.
        let snapshot = last_snapshot(&mut rx2);
        assert_eq!(snapshot.hole_cards.len(), 3);
        let total = snapshot
            .stacks
            .values()
            .fold(Chips::ZERO, |acc, c| acc + *c);
        assert_eq!(total, Chips::new(3_000));

        // The next hand rotates the button.
        start_hand(&mut state).await;
        let snapshot = last_snapshot(&mut rx1);
        assert_eq!(snapshot.positions, vec![bob, carol, alice]);
    }

    #[tokio::test]
    async fn join_with_insufficient_funds_is_refused() {
        let mut state = new_state();
        let player_id = PlayerId::from("highroller");
        let (table_tx, mut table_rx) = mpsc::channel(64);

        state
            .join(&player_id, 0, Chips::new(50_000), table_tx)
            .await;

        match table_rx.try_recv().unwrap() {
            TableMessage::Send(snapshot) => {
                assert_eq!(snapshot.message.as_deref(), Some("insufficient funds"));
            }
            msg => panic!("unexpected message {msg:?}"),
        }
        assert!(matches!(table_rx.try_recv().unwrap(), TableMessage::Close));

        assert!(!state.table.is_seated(&player_id));

        // The first contact still created the account.
        assert_eq!(
            state.ledger.balance(&player_id).await.unwrap(),
            State::DEFAULT_CHIPS
        );
    }

    #[tokio::test]
    async fn taken_seat_is_refused_and_refunded() {
        let mut state = new_state();
        let (_alice, _rx1) = join_player(&mut state, "alice", 0).await;

        let bob = PlayerId::from("bob");
        let (table_tx, mut table_rx) = mpsc::channel(64);
        state.join(&bob, 0, JOIN_CHIPS, table_tx).await;

        match table_rx.try_recv().unwrap() {
            TableMessage::Send(snapshot) => {
                assert_eq!(snapshot.message.as_deref(), Some("seat taken"));
            }
            msg => panic!("unexpected message {msg:?}"),
        }

        // The buy-in went back to the ledger.
        assert_eq!(
            state.ledger.balance(&bob).await.unwrap(),
            State::DEFAULT_CHIPS
        );
    }

    #[tokio::test]
    async fn seated_player_double_join_keeps_the_seat() {
        let mut state = new_state();
        let alice = PlayerId::from("alice");
        let (table_tx, mut table_rx) = mpsc::channel(64);
        state.join(&alice, 0, JOIN_CHIPS, table_tx.clone()).await;
        last_snapshot(&mut table_rx);

        state.join(&alice, 1, JOIN_CHIPS, table_tx).await;

        // The rejection is a message on the open connection.
        match table_rx.try_recv().unwrap() {
            TableMessage::Send(snapshot) => {
                assert_eq!(snapshot.message.as_deref(), Some("already joined"));
            }
            msg => panic!("unexpected message {msg:?}"),
        }
        assert!(table_rx.try_recv().is_err());

        // The seat survives and the second buy-in went back.
        assert!(state.table.is_seated(&alice));
        assert_eq!(state.table.stack(&alice), JOIN_CHIPS);
        assert_eq!(
            state.ledger.balance(&alice).await.unwrap(),
            State::DEFAULT_CHIPS - JOIN_CHIPS
        );
    }

    #[tokio::test]
    async fn tied_showdown_splits_the_pot() {
        let mut state = new_state();
        let (alice, mut rx1) = join_player(&mut state, "alice", 0).await;
        let (bob, _rx2) = join_player(&mut state, "bob", 1).await;
        start_hand(&mut state).await;

        // Heads up the small blind acts first.
        state.action(&alice, Action::Call).await;
        state.action(&bob, Action::Check).await;

        // Level the evaluations so the showdown is a dead heat.
        let hand = state.table.hand.as_mut().unwrap();
        let best = hand.hands.values().max().copied().unwrap();
        for value in hand.hands.values_mut() {
            *value = best;
        }

        state.showdown().await;

        let snapshot = last_snapshot(&mut rx1);
        assert!(snapshot.reveal);
        assert_eq!(
            snapshot.message.as_deref(),
            Some("alice wins 100, bob wins 100")
        );
        assert_eq!(snapshot.stacks.get(&alice), Some(&Chips::new(1_000)));
        assert_eq!(snapshot.stacks.get(&bob), Some(&Chips::new(1_000)));
        assert_eq!(snapshot.pot, Chips::ZERO);
        assert!(state.table.hand.is_none());
    }
}
