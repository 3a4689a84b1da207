//! Game variants
//!
//! A variant supplies the pure parts of a wager: what a valid selection is,
//! what the bet commits the house to at admission, how one random word turns
//! into an outcome, and what that outcome pays. The engine supplies
//! everything stateful around it.

pub mod dice;
pub mod grid;

pub use dice::{DiceGame, DiceSelection, Direction};
pub use grid::{CellMask, GridGame};

use crate::common::types::{Bet, RandomWord};
use crate::errors::WagerResult;
use serde::Serialize;
use std::fmt;

/// Settled result of a bet: whether it won and what it pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub won: bool,
    pub amount: u64,
}

impl Payout {
    pub const LOST: Payout = Payout { won: false, amount: 0 };
}

pub trait GameVariant: Send + Sync {
    type Selection: Copy + fmt::Debug + PartialEq + Serialize + Send + Sync + 'static;
    type Outcome: Copy + fmt::Debug + PartialEq + Serialize + Send + Sync + 'static;

    /// Short name used in logs
    const NAME: &'static str;

    fn validate_selection(&self, selection: &Self::Selection) -> WagerResult<()>;

    /// House edge (percent) applied to newly admitted bets
    fn house_edge(&self) -> u8;

    fn set_house_edge(&mut self, house_edge: u8) -> WagerResult<()>;

    /// Amount committed at admission and checked against custody:
    /// the winning payout for threshold games, the pot for combinatorial ones.
    fn committed_payout(&self, stake: u64, selection: &Self::Selection, house_edge: u8) -> WagerResult<u64>;

    /// Pure function of the random word and static game parameters
    fn derive_outcome(&self, random: &RandomWord) -> Self::Outcome;

    /// Payout of a frozen bet for a derived outcome
    fn payout(&self, bet: &Bet<Self::Selection>, outcome: &Self::Outcome) -> WagerResult<Payout>;
}
