//! Per-player bet ledger

use crate::common::types::{AccountId, Bet, RequestId, RollState};
use std::collections::HashMap;

/// Everything the engine remembers about one player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntry<S, O> {
    pub state: RollState<O>,
    /// Current bet: pending while in progress, otherwise the last settled one
    pub bet: Option<Bet<S>>,
    /// Last settled outcome, kept while a newer roll is pending
    pub last_outcome: Option<O>,
    /// Bet that produced `last_outcome`
    pub last_settled: Option<Bet<S>>,
}

impl<S, O> Default for PlayerEntry<S, O> {
    fn default() -> Self {
        Self {
            state: RollState::Unplayed,
            bet: None,
            last_outcome: None,
            last_settled: None,
        }
    }
}

pub struct BetLedger<S, O> {
    entries: HashMap<AccountId, PlayerEntry<S, O>>,
}

impl<S: Clone, O: Copy> BetLedger<S, O> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn entry(&self, player: &AccountId) -> Option<&PlayerEntry<S, O>> {
        self.entries.get(player)
    }

    pub fn state(&self, player: &AccountId) -> RollState<O> {
        self.entries
            .get(player)
            .map(|e| e.state)
            .unwrap_or_default()
    }

    pub fn current_bet(&self, player: &AccountId) -> Option<&Bet<S>> {
        self.entries.get(player).and_then(|e| e.bet.as_ref())
    }

    pub fn is_roll_in_progress(&self, player: &AccountId) -> bool {
        self.state(player).is_in_progress()
    }

    pub fn player_count(&self) -> usize {
        self.entries.len()
    }

    /// Mark `player` in progress with a freshly frozen bet
    pub fn begin(&mut self, player: &AccountId, request_id: RequestId, bet: Bet<S>) {
        let entry = self.entries.entry(player.clone()).or_default();
        entry.state = RollState::InProgress { request_id };
        entry.bet = Some(bet);
    }

    /// Record the settled bet and its outcome, clearing the in-progress state
    pub fn settle(&mut self, player: &AccountId, bet: Bet<S>, outcome: O) {
        let entry = self.entries.entry(player.clone()).or_default();
        entry.state = RollState::Settled { outcome };
        entry.bet = Some(bet.clone());
        entry.last_outcome = Some(outcome);
        entry.last_settled = Some(bet);
    }

    /// Drop the pending bet and return to the last settled bet and outcome
    pub fn cancel(&mut self, player: &AccountId) {
        if let Some(entry) = self.entries.get_mut(player) {
            entry.state = match entry.last_outcome {
                Some(outcome) => RollState::Settled { outcome },
                None => RollState::Unplayed,
            };
            entry.bet = entry.last_settled.clone();
        }
    }

    /// Put back an entry captured before a failed operation
    pub fn restore(&mut self, player: &AccountId, previous: Option<PlayerEntry<S, O>>) {
        match previous {
            Some(entry) => {
                self.entries.insert(player.clone(), entry);
            }
            None => {
                self.entries.remove(player);
            }
        }
    }
}

impl<S: Clone, O: Copy> Default for BetLedger<S, O> {
    fn default() -> Self {
        Self::new()
    }
}
