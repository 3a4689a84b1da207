//! Bet admission
//!
//! Every precondition is checked before any value moves. The stake is pulled
//! only once all checks pass, and is returned if the oracle then refuses the
//! request, so a failed admission leaves nothing behind.

use crate::common::traits::{AssetLedger, RandomnessRequest};
use crate::common::types::{AccountId, Asset, Bet, RequestId};
use crate::engine::{PendingRequest, WagerEngine};
use crate::errors::{WagerError, WagerResult};
use crate::events::EngineEvent;
use crate::games::GameVariant;

/// A player's request to place a bet
#[derive(Debug, Clone, PartialEq)]
pub struct BetRequest<S> {
    pub player: AccountId,
    /// Declared stake; for native bets 0 means "whatever was sent"
    pub stake: u64,
    /// Native value transferred alongside the call
    pub value_sent: u64,
    pub selection: S,
    pub asset: Asset,
}

impl<S> BetRequest<S> {
    /// Native-asset bet sending exactly `stake`
    pub fn native(player: impl Into<AccountId>, stake: u64, selection: S) -> Self {
        Self {
            player: player.into(),
            stake,
            value_sent: stake,
            selection,
            asset: Asset::Native,
        }
    }

    /// Token bet pulling `stake` from the player's approved balance
    pub fn token(player: impl Into<AccountId>, symbol: &str, stake: u64, selection: S) -> Self {
        Self {
            player: player.into(),
            stake,
            value_sent: 0,
            selection,
            asset: Asset::token(symbol),
        }
    }
}

/// Effective stake for the asset kind, rejecting inconsistent value transfers
fn resolve_stake(asset: &Asset, stake: u64, value_sent: u64) -> WagerResult<u64> {
    match asset {
        Asset::Native => {
            if stake != 0 && stake != value_sent {
                return Err(WagerError::AssetValueMismatch(format!(
                    "declared stake {} but sent {}",
                    stake, value_sent
                )));
            }
            Ok(value_sent)
        }
        Asset::Token(symbol) => {
            if value_sent != 0 {
                return Err(WagerError::AssetValueMismatch(format!(
                    "sent {} native value with a {} bet",
                    value_sent, symbol
                )));
            }
            Ok(stake)
        }
    }
}

impl<G: GameVariant> WagerEngine<G> {
    /// Admit a bet and dispatch its randomness request
    pub fn place_bet(&mut self, request: BetRequest<G::Selection>) -> WagerResult<RequestId> {
        let BetRequest {
            player,
            stake,
            value_sent,
            selection,
            asset,
        } = request;

        if !self.collaborators.registry.is_registered(&self.id) {
            return Err(WagerError::GameNotRegistered(self.id.clone()));
        }
        self.collaborators.pause_gate.require_not_paused(&self.id)?;
        self.collaborators.asset_support.require_supported(&asset)?;
        let asset_ledger = self.collaborators.ledgers.resolve(&asset)?;
        let stake = resolve_stake(&asset, stake, value_sent)?;

        if self.ledger.is_roll_in_progress(&player) {
            return Err(WagerError::RollInProgress(player));
        }
        self.settings.limits.check(stake)?;
        self.game.validate_selection(&selection)?;

        let house_edge = self.game.house_edge();
        let committed_payout = self.game.committed_payout(stake, &selection, house_edge)?;

        let custody = asset_ledger.balance_of(&self.id);
        if (custody as u128) + (stake as u128) < committed_payout as u128 {
            return Err(WagerError::InsufficientEngineBalance {
                required: committed_payout,
                available: custody.saturating_add(stake),
            });
        }

        asset_ledger.transfer_in(&player, &self.id, stake)?;

        let randomness = RandomnessRequest {
            requester: self.id.clone(),
            num_words: 1,
            callback_gas_limit: self.settings.oracle.callback_gas_limit,
            request_confirmations: self.settings.oracle.request_confirmations,
        };
        let request_id = match self.collaborators.oracle.request(&randomness) {
            Ok(request_id) => request_id,
            Err(e) => {
                tracing::warn!("Randomness request for {} failed, refunding {}: {}", player, stake, e);
                self.refund_stake(asset_ledger.as_ref(), &player, stake, &asset);
                return Err(e.into());
            }
        };

        let bet = Bet::frozen(stake, selection, asset.clone(), house_edge, committed_payout);
        let pending = PendingRequest {
            player: player.clone(),
            bet: bet.clone(),
            requested_at: self.collaborators.clock.now(),
        };
        if let Err(e) = self.pending.add_pending(request_id, pending) {
            tracing::error!(
                "Oracle {} reissued pending request {}, refunding {} to {}",
                self.collaborators.oracle.id(),
                request_id,
                stake,
                player
            );
            self.refund_stake(asset_ledger.as_ref(), &player, stake, &asset);
            return Err(e);
        }
        self.ledger.begin(&player, request_id, bet);

        self.stats.bets_admitted += 1;
        self.stats.total_wagered += stake as u128;

        tracing::info!(
            "🎲 {} bet admitted: player={} stake={} {} request={}",
            G::NAME,
            player,
            stake,
            asset,
            request_id
        );
        tracing::debug!("Selection {:?}, committed payout {}", selection, committed_payout);

        self.events.emit(EngineEvent::RollRequested {
            request_id,
            player,
            stake,
            selection,
            asset,
        });

        Ok(request_id)
    }

    /// Return a stake pulled by an admission that did not go through
    fn refund_stake(&self, asset_ledger: &dyn AssetLedger, player: &AccountId, stake: u64, asset: &Asset) {
        if let Err(e) = asset_ledger.transfer_out(&self.id, player, stake) {
            tracing::error!("Refund of {} {} to {} failed: {}", stake, asset, player, e);
        }
    }
}
