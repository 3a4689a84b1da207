//! Threshold ("dice") variant
//!
//! A roll is `(random mod 100) + 1`. The player picks a target and a
//! direction and wins if the roll lands strictly beyond the target. The house
//! edge grows with the win probability, so safe bets pay proportionally less.

use crate::common::types::{Bet, RandomWord};
use crate::errors::{ConfigurationError, WagerError, WagerResult};
use crate::games::{GameVariant, Payout};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ROLL_SIDES: u64 = 100;

/// Extra edge per point of win probability: `floor(probability * 15 / 100)`
const EDGE_SLOPE_NUMERATOR: u64 = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Win if roll > target
    Over,
    /// Win if roll < target
    Under,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Over => write!(f, "over"),
            Direction::Under => write!(f, "under"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiceSelection {
    pub target: u8,
    pub direction: Direction,
}

impl DiceSelection {
    pub fn over(target: u8) -> Self {
        Self { target, direction: Direction::Over }
    }

    pub fn under(target: u8) -> Self {
        Self { target, direction: Direction::Under }
    }
}

/// Roll in `[1, 100]` derived from a random word
pub fn roll_from_random(random: &RandomWord) -> u8 {
    (random.rem_u64(ROLL_SIDES) + 1) as u8
}

pub fn is_win(selection: &DiceSelection, roll: u8) -> bool {
    match selection.direction {
        Direction::Over => roll > selection.target,
        Direction::Under => roll < selection.target,
    }
}

/// Number of rolls out of 100 that win; zero for impossible selections
pub fn win_probability(selection: &DiceSelection) -> u64 {
    let target = selection.target as u64;
    match selection.direction {
        Direction::Over => ROLL_SIDES.saturating_sub(target),
        Direction::Under => target.saturating_sub(1),
    }
}

pub fn dynamic_house_edge(probability: u64, base_edge: u8) -> u64 {
    let base = base_edge as u64;
    (base + probability * EDGE_SLOPE_NUMERATOR / 100).max(base)
}

/// Payout multiplier in hundredths: `100 * (100 - edge) / probability`
pub fn payout_multiplier(selection: &DiceSelection, base_edge: u8) -> WagerResult<u64> {
    let probability = win_probability(selection);
    if probability == 0 {
        return Err(WagerError::ZeroProbability { target: selection.target });
    }
    let edge = dynamic_house_edge(probability, base_edge);
    Ok(100 * 100u64.saturating_sub(edge) / probability)
}

/// Winning payout: `floor(stake * multiplier / 100)`
pub fn payout_for(stake: u64, selection: &DiceSelection, base_edge: u8) -> WagerResult<u64> {
    let multiplier = payout_multiplier(selection, base_edge)?;
    let payout = stake as u128 * multiplier as u128 / 100;
    u64::try_from(payout).map_err(|_| WagerError::Overflow("dice payout"))
}

/// Threshold game parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceGame {
    pub min_target: u8,
    pub max_target: u8,
    pub base_house_edge: u8,
}

impl Default for DiceGame {
    fn default() -> Self {
        Self {
            min_target: 1,
            max_target: 100,
            base_house_edge: 1,
        }
    }
}

impl DiceGame {
    pub fn set_target_bounds(&mut self, min_target: u8, max_target: u8) -> WagerResult<()> {
        if min_target == 0 || max_target as u64 > ROLL_SIDES || min_target > max_target {
            return Err(ConfigurationError::InvalidValue {
                field: "dice.target_bounds".to_string(),
                value: format!("[{}, {}]", min_target, max_target),
                reason: format!("must be an ordered range within [1, {}]", ROLL_SIDES),
            }
            .into());
        }
        self.min_target = min_target;
        self.max_target = max_target;
        Ok(())
    }
}

impl GameVariant for DiceGame {
    type Selection = DiceSelection;
    type Outcome = u8;

    const NAME: &'static str = "dice";

    fn validate_selection(&self, selection: &DiceSelection) -> WagerResult<()> {
        if selection.target < self.min_target || selection.target > self.max_target {
            return Err(WagerError::InvalidSelection(format!(
                "target {} outside [{}, {}]",
                selection.target, self.min_target, self.max_target
            )));
        }
        if win_probability(selection) == 0 {
            return Err(WagerError::InvalidSelection(format!(
                "target {} {} can never win",
                selection.direction, selection.target
            )));
        }
        Ok(())
    }

    fn house_edge(&self) -> u8 {
        self.base_house_edge
    }

    fn set_house_edge(&mut self, house_edge: u8) -> WagerResult<()> {
        // The largest probability (99) adds 14 points of edge on top.
        let worst = dynamic_house_edge(ROLL_SIDES - 1, house_edge);
        if worst >= 100 {
            return Err(ConfigurationError::InvalidValue {
                field: "dice.base_house_edge".to_string(),
                value: house_edge.to_string(),
                reason: "leaves no payout at high win probability".to_string(),
            }
            .into());
        }
        self.base_house_edge = house_edge;
        Ok(())
    }

    fn committed_payout(&self, stake: u64, selection: &DiceSelection, house_edge: u8) -> WagerResult<u64> {
        payout_for(stake, selection, house_edge)
    }

    fn derive_outcome(&self, random: &RandomWord) -> u8 {
        roll_from_random(random)
    }

    fn payout(&self, bet: &Bet<DiceSelection>, roll: &u8) -> WagerResult<Payout> {
        if !is_win(&bet.selection, *roll) {
            return Ok(Payout::LOST);
        }
        let amount = payout_for(bet.stake, &bet.selection, bet.house_edge)?;
        Ok(Payout { won: true, amount })
    }
}
