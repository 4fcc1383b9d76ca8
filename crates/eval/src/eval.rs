// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Poker hand evaluator.
//!
//! A 5-card hand evaluates to a [HandValue], a [HandRank] category plus a
//! tiebreak sequence of up to five ranks padded with zeros. Values compare
//! category first then tiebreak lexicographically, which totally orders any
//! two hands; equal values are equal-strength hands for split pots.
use serde::{Deserialize, Serialize};
use std::fmt;

use riverboat_cards::Card;

/// The rank of a Poker hand, weakest to strongest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum HandRank {
    /// High card.
    #[serde(rename = "High card")]
    HighCard,
    /// One pair.
    #[serde(rename = "One pair")]
    OnePair,
    /// Two pair.
    #[serde(rename = "Two pair")]
    TwoPair,
    /// Three of a kind.
    #[serde(rename = "Three of a kind")]
    ThreeOfAKind,
    /// Straight.
    #[serde(rename = "Straight")]
    Straight,
    /// Flush.
    #[serde(rename = "Flush")]
    Flush,
    /// Full house.
    #[serde(rename = "Full house")]
    FullHouse,
    /// Four of a kind.
    #[serde(rename = "Four of a kind")]
    FourOfAKind,
    /// Straight flush.
    #[serde(rename = "Straight flush")]
    StraightFlush,
    /// Royal flush.
    #[serde(rename = "Royal flush")]
    RoyalFlush,
}

impl HandRank {
    /// The rank label.
    pub fn label(&self) -> &'static str {
        match self {
            HandRank::HighCard => "High card",
            HandRank::OnePair => "One pair",
            HandRank::TwoPair => "Two pair",
            HandRank::ThreeOfAKind => "Three of a kind",
            HandRank::Straight => "Straight",
            HandRank::Flush => "Flush",
            HandRank::FullHouse => "Full house",
            HandRank::FourOfAKind => "Four of a kind",
            HandRank::StraightFlush => "Straight flush",
            HandRank::RoyalFlush => "Royal flush",
        }
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The value of a Poker hand.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HandValue {
    rank: HandRank,
    tiebreak: [u8; 5],
}

impl HandValue {
    /// Evaluates a 5 cards hand.
    ///
    /// Panics if not given exactly 5 cards.
    pub fn eval5(cards: &[Card]) -> HandValue {
        assert_eq!(cards.len(), 5, "eval5 requires 5 cards");

        // Ranks in descending order.
        let mut ranks = [0u8; 5];
        for (rank, card) in ranks.iter_mut().zip(cards) {
            *rank = card.rank().value();
        }
        ranks.sort_unstable_by(|a, b| b.cmp(a));

        let flush = cards.windows(2).all(|w| w[0].suit() == w[1].suit());
        let distinct = ranks.windows(2).all(|w| w[0] > w[1]);
        let run = distinct && ranks[0] - ranks[4] == 4;
        let wheel = distinct && ranks == [14, 5, 4, 3, 2];

        if run || wheel {
            // The wheel A-2-3-4-5 scores as a 5-high straight.
            let high = if wheel { 5 } else { ranks[0] };
            let rank = match (flush, high) {
                (true, 14) => HandRank::RoyalFlush,
                (true, _) => HandRank::StraightFlush,
                (false, _) => HandRank::Straight,
            };

            return HandValue {
                rank,
                tiebreak: [high, 0, 0, 0, 0],
            };
        }

        if flush {
            return HandValue {
                rank: HandRank::Flush,
                tiebreak: ranks,
            };
        }

        // Group ranks and order groups by multiplicity then rank descending,
        // the grouped ranks followed by the kickers are the tiebreak.
        let mut groups: Vec<(u8, u8)> = Vec::with_capacity(5);
        for &rank in &ranks {
            match groups.iter_mut().find(|(_, r)| *r == rank) {
                Some((count, _)) => *count += 1,
                None => groups.push((1, rank)),
            }
        }
        groups.sort_unstable_by(|a, b| b.cmp(a));

        let mut tiebreak = [0u8; 5];
        for (t, (_, rank)) in tiebreak.iter_mut().zip(&groups) {
            *t = *rank;
        }

        let mut shape = [0u8; 5];
        for (s, (count, _)) in shape.iter_mut().zip(&groups) {
            *s = *count;
        }

        let rank = match shape {
            [4, 1, 0, 0, 0] => HandRank::FourOfAKind,
            [3, 2, 0, 0, 0] => HandRank::FullHouse,
            [3, 1, 1, 0, 0] => HandRank::ThreeOfAKind,
            [2, 2, 1, 0, 0] => HandRank::TwoPair,
            [2, 1, 1, 1, 0] => HandRank::OnePair,
            _ => HandRank::HighCard,
        };

        HandValue { rank, tiebreak }
    }

    /// Evaluates the best 5 cards hand out of 5 to 7 cards.
    ///
    /// Exhaustively evaluates every 5 cards combination and returns the
    /// maximum. Panics if not given 5 to 7 cards.
    pub fn eval(cards: &[Card]) -> HandValue {
        let n = cards.len();
        assert!((5..=7).contains(&n), "eval requires 5 to 7 cards");

        let mut best: Option<HandValue> = None;
        for c1 in 0..n - 4 {
            for c2 in c1 + 1..n - 3 {
                for c3 in c2 + 1..n - 2 {
                    for c4 in c3 + 1..n - 1 {
                        for c5 in c4 + 1..n {
                            let hand =
                                [cards[c1], cards[c2], cards[c3], cards[c4], cards[c5]];
                            let hv = Self::eval5(&hand);
                            if best.map_or(true, |b| hv > b) {
                                best = Some(hv);
                            }
                        }
                    }
                }
            }
        }

        best.unwrap()
    }

    /// The hand rank category.
    pub fn rank(&self) -> HandRank {
        self.rank
    }

    /// The tiebreak ranks, grouped ranks then kickers, zero padded.
    pub fn tiebreak(&self) -> &[u8; 5] {
        &self.tiebreak
    }
}

impl fmt::Display for HandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rank)
    }
}
