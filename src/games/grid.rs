//! Combinatorial ("grid cell pick") variant
//!
//! The player marks exactly 5 of 25 cells. The draw picks 5 distinct cells
//! without replacement from one random word, reseeding it with SHA-256 after
//! every pick. The pot is fixed at admission; the payout is a share of the
//! pot that depends on how many marked cells were drawn.

use crate::common::types::{Bet, RandomWord};
use crate::errors::{ConfigurationError, WagerError, WagerResult};
use crate::games::{GameVariant, Payout};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const GRID_CELLS: u8 = 25;
pub const GRID_PICKS: u8 = 5;

/// Share of the pot (percent) indexed by number of matched cells
pub const MATCH_SHARE_PERCENT: [u64; GRID_PICKS as usize + 1] = [0, 30, 40, 70, 90, 100];

/// Bit set over the grid; bit `i` marks cell `i`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellMask(u32);

impl CellMask {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn contains(&self, cell: u8) -> bool {
        cell < 32 && self.0 & (1 << cell) != 0
    }

    /// Number of cells set in both masks
    pub fn matches(&self, other: &CellMask) -> u32 {
        (self.0 & other.0).count_ones()
    }

    /// Exactly `picks` bits set, none outside a `cells`-wide universe
    pub fn is_valid_pick(&self, cells: u8, picks: u8) -> bool {
        let outside = if cells >= 32 { 0 } else { self.0 >> cells };
        outside == 0 && self.count() == picks as u32
    }
}

impl fmt::Debug for CellMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellMask({:#09x} {:?})", self.0, unpack(*self))
    }
}

/// Pack exactly [`GRID_PICKS`] distinct cells into a mask
pub fn pack(cells: &[u8]) -> WagerResult<CellMask> {
    if cells.len() != GRID_PICKS as usize {
        return Err(WagerError::InvalidSelection(format!(
            "expected {} cells, got {}",
            GRID_PICKS,
            cells.len()
        )));
    }
    let mut mask = 0u32;
    for &cell in cells {
        if cell >= GRID_CELLS {
            return Err(WagerError::InvalidSelection(format!(
                "cell {} outside grid of {}",
                cell, GRID_CELLS
            )));
        }
        if mask & (1 << cell) != 0 {
            return Err(WagerError::InvalidSelection(format!("cell {} picked twice", cell)));
        }
        mask |= 1 << cell;
    }
    Ok(CellMask(mask))
}

/// Cells set in `mask`, ascending
pub fn unpack(mask: CellMask) -> Vec<u8> {
    (0..32u8).filter(|cell| mask.contains(*cell)).collect()
}

/// `sha256(random_be_bytes || draw_index)`
pub fn reseed(random: &RandomWord, draw_index: u8) -> RandomWord {
    let mut hasher = Sha256::new();
    hasher.update(random.as_bytes());
    hasher.update([draw_index]);
    let digest: [u8; 32] = hasher.finalize().into();
    RandomWord::from_be_bytes(digest)
}

/// Draw `picks` distinct cells out of `cells` without replacement.
///
/// Each draw takes `current mod remaining` as an index into the cells not yet
/// drawn, swap-removes it, then reseeds `current` with the draw index.
pub fn draw_cells(random: &RandomWord, cells: u8, picks: u8) -> CellMask {
    debug_assert!(cells <= 32 && picks <= cells);
    let mut available: Vec<u8> = (0..cells).collect();
    let mut remaining = cells as usize;
    let mut current = *random;
    let mut mask = 0u32;

    for draw_index in 0..picks {
        let index = current.rem_u64(remaining as u64) as usize;
        let selected = available[index];
        mask |= 1 << selected;

        available[index] = available[remaining - 1];
        remaining -= 1;

        current = reseed(&current, draw_index);
    }

    CellMask(mask)
}

/// Pot committed at admission: `floor(stake * 2 * (100 - edge) / 100)`
pub fn pot_for(stake: u64, house_edge: u8) -> WagerResult<u64> {
    let pot = stake as u128 * 2 * 100u128.saturating_sub(house_edge as u128) / 100;
    u64::try_from(pot).map_err(|_| WagerError::Overflow("grid pot"))
}

/// `floor(pot * share[matches] / 100)`
pub fn payout_for_matches(pot: u64, matches: u32) -> u64 {
    let share = MATCH_SHARE_PERCENT
        .get(matches as usize)
        .copied()
        .unwrap_or(0);
    (pot as u128 * share as u128 / 100) as u64
}

/// Combinatorial game parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridGame {
    pub house_edge: u8,
}

impl Default for GridGame {
    fn default() -> Self {
        Self { house_edge: 5 }
    }
}

impl GameVariant for GridGame {
    type Selection = CellMask;
    type Outcome = CellMask;

    const NAME: &'static str = "grid";

    fn validate_selection(&self, selection: &CellMask) -> WagerResult<()> {
        if !selection.is_valid_pick(GRID_CELLS, GRID_PICKS) {
            return Err(WagerError::InvalidSelection(format!(
                "mask {:#x} must set exactly {} of the first {} bits",
                selection.bits(),
                GRID_PICKS,
                GRID_CELLS
            )));
        }
        Ok(())
    }

    fn house_edge(&self) -> u8 {
        self.house_edge
    }

    fn set_house_edge(&mut self, house_edge: u8) -> WagerResult<()> {
        if house_edge >= 100 {
            return Err(ConfigurationError::InvalidValue {
                field: "grid.house_edge".to_string(),
                value: house_edge.to_string(),
                reason: "must be below 100".to_string(),
            }
            .into());
        }
        self.house_edge = house_edge;
        Ok(())
    }

    fn committed_payout(&self, stake: u64, _selection: &CellMask, house_edge: u8) -> WagerResult<u64> {
        pot_for(stake, house_edge)
    }

    fn derive_outcome(&self, random: &RandomWord) -> CellMask {
        draw_cells(random, GRID_CELLS, GRID_PICKS)
    }

    fn payout(&self, bet: &Bet<CellMask>, winning: &CellMask) -> WagerResult<Payout> {
        let amount = payout_for_matches(bet.committed_payout, bet.selection.matches(winning));
        Ok(Payout { won: amount > 0, amount })
    }
}
