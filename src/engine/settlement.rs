//! Randomness fulfillment and settlement
//!
//! The ledger is updated before any value leaves custody. If the payout
//! transfer then fails, the ledger, pending pool and stats are put back
//! exactly as they were, so a failed settlement changes nothing and the
//! request can be delivered again.

use crate::common::traits::Capability;
use crate::common::types::{AccountId, Bet, RandomWord, RequestId, RollState};
use crate::engine::WagerEngine;
use crate::errors::{WagerError, WagerResult};
use crate::events::EngineEvent;
use crate::games::{GameVariant, Payout};
use serde::Serialize;

/// What a successful fulfillment did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementReport<S, O> {
    pub request_id: RequestId,
    pub player: AccountId,
    pub random_word: RandomWord,
    pub outcome: O,
    pub payout: Payout,
    /// Bet as recorded after settlement
    pub bet: Bet<S>,
}

impl<G: GameVariant> WagerEngine<G> {
    /// Oracle callback: derive the outcome for `request_id` and settle its bet
    pub fn fulfill_random_words(
        &mut self,
        caller: &AccountId,
        request_id: RequestId,
        random_words: &[RandomWord],
    ) -> WagerResult<SettlementReport<G::Selection, G::Outcome>> {
        if *caller != self.collaborators.oracle.id() {
            return Err(WagerError::NotOracle(caller.clone()));
        }
        let random_word = match random_words {
            [word] => *word,
            _ => return Err(WagerError::InvalidFulfillment(random_words.len())),
        };
        let pending = self
            .pending
            .get(&request_id)
            .ok_or(WagerError::UnknownRequest(request_id))?;

        let outcome = self.game.derive_outcome(&random_word);
        let payout = self.game.payout(&pending.bet, &outcome)?;
        let asset_ledger = self.collaborators.ledgers.resolve(&pending.bet.asset)?;

        if payout.amount > 0 {
            let available = asset_ledger.balance_of(&self.id);
            if available < payout.amount {
                tracing::error!(
                    "❌ Cannot settle request {}: payout {} exceeds custody {}",
                    request_id,
                    payout.amount,
                    available
                );
                return Err(WagerError::InsufficientEngineBalance {
                    required: payout.amount,
                    available,
                });
            }
        }

        // Effects
        let pending = self
            .pending
            .take(&request_id)
            .ok_or(WagerError::UnknownRequest(request_id))?;
        let player = pending.player.clone();
        let previous_entry = self.ledger.entry(&player).cloned();
        let previous_stats = self.stats;

        let mut bet = pending.bet.clone();
        bet.settled = true;
        bet.won = payout.won;
        bet.payout = payout.amount;
        self.ledger.settle(&player, bet.clone(), outcome);

        self.stats.bets_settled += 1;
        if payout.won {
            self.stats.bets_won += 1;
        }
        self.stats.total_paid_out += payout.amount as u128;

        // Interactions
        if payout.amount > 0 {
            if let Err(e) = asset_ledger.transfer_out(&self.id, &player, payout.amount) {
                tracing::error!("❌ Payout of {} to {} failed, rolling back: {}", payout.amount, player, e);
                self.ledger.restore(&player, previous_entry);
                self.pending.reinstate(request_id, pending);
                self.stats = previous_stats;
                return Err(e.into());
            }
        }

        if let Err(e) = self
            .collaborators
            .referral
            .add_reward(&player, bet.stake, &bet.asset)
        {
            tracing::warn!("Referral reward for {} not recorded: {}", player, e);
        }

        tracing::info!(
            "✅ {} request {} settled: player={} outcome={:?} {} payout={}",
            G::NAME,
            request_id,
            player,
            outcome,
            if payout.won { "won" } else { "lost" },
            payout.amount
        );

        self.events.emit(EngineEvent::RollFulfilled {
            request_id,
            player: player.clone(),
            outcome,
            won: payout.won,
            payout: payout.amount,
            asset: bet.asset.clone(),
        });
        self.events.emit(EngineEvent::BetSettled {
            player: player.clone(),
            stake: bet.stake,
            selection: bet.selection,
            outcome,
            won: payout.won,
            payout: payout.amount,
            asset: bet.asset.clone(),
        });

        Ok(SettlementReport {
            request_id,
            player,
            random_word,
            outcome,
            payout,
            bet,
        })
    }

    /// Refund a bet whose randomness never arrived.
    ///
    /// Callable by the player or an `Operator` once the request has been
    /// pending longer than the configured expiry. Returns the refunded stake.
    pub fn cancel_expired_bet(&mut self, caller: &AccountId, player: &AccountId) -> WagerResult<u64> {
        if caller != player {
            self.collaborators
                .access
                .require_capability(caller, Capability::Operator)?;
        }
        let expiry = self
            .settings
            .request_expiry
            .ok_or(WagerError::CancellationDisabled)?;

        let request_id = match self.ledger.state(player) {
            RollState::InProgress { request_id } => request_id,
            _ => return Err(WagerError::NoBetInProgress(player.clone())),
        };
        let pending = self
            .pending
            .get(&request_id)
            .ok_or(WagerError::UnknownRequest(request_id))?;
        if pending.player != *player {
            tracing::error!(
                "Request {} is held by {}, not {}; refusing cancellation",
                request_id,
                pending.player,
                player
            );
            return Err(WagerError::NoBetInProgress(player.clone()));
        }

        let expires_at = pending
            .requested_at
            .checked_add_signed(expiry)
            .ok_or(WagerError::Overflow("request expiry"))?;
        if self.collaborators.clock.now() < expires_at {
            return Err(WagerError::RequestNotExpired {
                request_id,
                expires_at,
            });
        }
        let asset_ledger = self.collaborators.ledgers.resolve(&pending.bet.asset)?;

        // Effects
        let pending = self
            .pending
            .take(&request_id)
            .ok_or(WagerError::UnknownRequest(request_id))?;
        let previous_entry = self.ledger.entry(player).cloned();
        let previous_stats = self.stats;
        self.ledger.cancel(player);
        self.stats.bets_cancelled += 1;

        // Interactions
        let refund = pending.bet.stake;
        if let Err(e) = asset_ledger.transfer_out(&self.id, player, refund) {
            tracing::error!("❌ Refund of {} to {} failed, rolling back: {}", refund, player, e);
            self.ledger.restore(player, previous_entry);
            self.pending.reinstate(request_id, pending);
            self.stats = previous_stats;
            return Err(e.into());
        }

        tracing::info!(
            "↩️ {} request {} cancelled by {}: refunded {} {} to {}",
            G::NAME,
            request_id,
            caller,
            refund,
            pending.bet.asset,
            player
        );

        self.events.emit(EngineEvent::BetCancelled {
            request_id,
            player: player.clone(),
            refund,
            asset: pending.bet.asset,
        });

        Ok(refund)
    }
}
