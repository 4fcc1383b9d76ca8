// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Riverboat Poker hand evaluator.
//!
//! Evaluates 5, 6, and 7 cards Poker hands by classifying the rank multiset
//! of every 5-card combination. To evaluate a hand create the cards and use
//! [HandValue] to get a totally ordered value:
//!
//! ```
//! # use riverboat_eval::*;
//! // 2S, 3S, .., JS
//! let cards = Deck::default().into_iter().take(10).collect::<Vec<_>>();
//! let v1 = HandValue::eval(&cards[0..5]);
//! let v2 = HandValue::eval(&cards[5..]);
//! assert!(v2 > v1);
//! ```
#![warn(clippy::all, rust_2018_idioms, missing_docs)]
pub mod eval;
pub use eval::{HandRank, HandValue};

// Reexport cards types.
pub use riverboat_cards::{Card, Deck, Rank, Suit};
