//! Wagering engine
//!
//! One `WagerEngine` serves one game variant. Every mutating entry point takes
//! `&mut self`, so admissions, fulfillments and cancellations are applied one
//! at a time and can never re-enter each other; share an engine across tasks
//! behind `Arc<tokio::sync::Mutex<_>>`.
//!
//! The only suspension point is between [`WagerEngine::place_bet`], which
//! dispatches a randomness request, and
//! [`WagerEngine::fulfill_random_words`], which the oracle calls back with
//! the random word for that request.

pub mod admission;
pub mod ledger;
pub mod pending_pool;
pub mod settlement;

pub use admission::BetRequest;
pub use ledger::{BetLedger, PlayerEntry};
pub use pending_pool::{PendingPool, PendingRequest};
pub use settlement::SettlementReport;

use crate::common::traits::{Capability, Collaborators, RandomnessOracle};
use crate::common::types::{AccountId, Bet, RequestId, RollState};
use crate::config::{expiry_duration, OracleConfig, WagerConfig};
use crate::errors::{ConfigurationError, WagerError, WagerResult};
use crate::events::EventSink;
use crate::games::{DiceGame, GameVariant, GridGame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inclusive stake bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeLimits {
    pub min_bet: u64,
    pub max_bet: u64,
}

impl StakeLimits {
    pub fn new(min_bet: u64, max_bet: u64) -> WagerResult<Self> {
        if min_bet == 0 || min_bet > max_bet {
            return Err(ConfigurationError::InvalidValue {
                field: "stake_limits".to_string(),
                value: format!("[{}, {}]", min_bet, max_bet),
                reason: "min must be positive and not above max".to_string(),
            }
            .into());
        }
        Ok(Self { min_bet, max_bet })
    }

    pub fn check(&self, amount: u64) -> WagerResult<()> {
        if amount < self.min_bet || amount > self.max_bet {
            return Err(WagerError::InvalidBetAmount {
                amount,
                min: self.min_bet,
                max: self.max_bet,
            });
        }
        Ok(())
    }
}

/// Engine-level settings shared by both variants
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub limits: StakeLimits,
    pub oracle: OracleConfig,
    /// How long a request may stay unfulfilled before it can be cancelled
    pub request_expiry: Option<chrono::Duration>,
}

/// Running totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub bets_admitted: u64,
    pub bets_settled: u64,
    pub bets_won: u64,
    pub bets_cancelled: u64,
    pub total_wagered: u128,
    pub total_paid_out: u128,
}

pub struct WagerEngine<G: GameVariant> {
    id: AccountId,
    game: G,
    settings: EngineSettings,
    collaborators: Collaborators,
    events: Arc<dyn EventSink<G::Selection, G::Outcome>>,
    ledger: BetLedger<G::Selection, G::Outcome>,
    pending: PendingPool<G::Selection>,
    stats: EngineStats,
}

impl<G: GameVariant> WagerEngine<G> {
    pub fn new(
        id: AccountId,
        game: G,
        settings: EngineSettings,
        collaborators: Collaborators,
        events: Arc<dyn EventSink<G::Selection, G::Outcome>>,
    ) -> Self {
        tracing::info!(
            "Created {} engine {} (stake [{}, {}], house edge {}%)",
            G::NAME,
            id,
            settings.limits.min_bet,
            settings.limits.max_bet,
            game.house_edge()
        );
        Self {
            id,
            game,
            settings,
            collaborators,
            events,
            ledger: BetLedger::new(),
            pending: PendingPool::new(),
            stats: EngineStats::default(),
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Current (pending or last settled) bet for `player`
    pub fn current_bet(&self, player: &AccountId) -> Option<&Bet<G::Selection>> {
        self.ledger.current_bet(player)
    }

    /// Last derived outcome; `None` both before the first roll and while one is pending
    pub fn latest_outcome(&self, player: &AccountId) -> Option<G::Outcome> {
        self.ledger.state(player).outcome()
    }

    pub fn is_roll_in_progress(&self, player: &AccountId) -> bool {
        self.ledger.is_roll_in_progress(player)
    }

    pub fn roll_state(&self, player: &AccountId) -> RollState<G::Outcome> {
        self.ledger.state(player)
    }

    pub fn pending_request(&self, request_id: &RequestId) -> Option<&PendingRequest<G::Selection>> {
        self.pending.get(request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    pub fn set_stake_limits(&mut self, caller: &AccountId, min_bet: u64, max_bet: u64) -> WagerResult<()> {
        self.collaborators.access.require_capability(caller, Capability::Configure)?;
        self.settings.limits = StakeLimits::new(min_bet, max_bet)?;
        tracing::info!("{} stake limits set to [{}, {}] by {}", self.id, min_bet, max_bet, caller);
        Ok(())
    }

    /// Applies to bets admitted from now on; pending bets keep their frozen edge
    pub fn set_house_edge(&mut self, caller: &AccountId, house_edge: u8) -> WagerResult<()> {
        self.collaborators.access.require_capability(caller, Capability::Configure)?;
        self.game.set_house_edge(house_edge)?;
        tracing::info!("{} house edge set to {}% by {}", self.id, house_edge, caller);
        Ok(())
    }

    pub fn set_oracle_params(
        &mut self,
        caller: &AccountId,
        callback_gas_limit: u32,
        request_confirmations: u16,
    ) -> WagerResult<()> {
        self.collaborators.access.require_capability(caller, Capability::Configure)?;
        let oracle = OracleConfig {
            callback_gas_limit,
            request_confirmations,
        };
        oracle.validate()?;
        self.settings.oracle = oracle;
        Ok(())
    }

    /// Point the engine at a different oracle endpoint.
    ///
    /// Only the new oracle may deliver from now on, including for requests
    /// dispatched before the change.
    pub fn set_oracle(&mut self, caller: &AccountId, oracle: Arc<dyn RandomnessOracle>) -> WagerResult<()> {
        self.collaborators.access.require_capability(caller, Capability::Configure)?;
        tracing::info!("{} oracle changed from {} to {} by {}", self.id, self.collaborators.oracle.id(), oracle.id(), caller);
        self.collaborators.oracle = oracle;
        Ok(())
    }

    pub fn set_request_expiry(&mut self, caller: &AccountId, expiry_secs: Option<u64>) -> WagerResult<()> {
        self.collaborators.access.require_capability(caller, Capability::Configure)?;
        self.settings.request_expiry = match expiry_secs {
            Some(secs) => expiry_duration(secs)?,
            None => None,
        };
        Ok(())
    }
}

impl WagerEngine<DiceGame> {
    /// Threshold engine configured from `config.dice`
    pub fn dice(
        config: &WagerConfig,
        collaborators: Collaborators,
        events: Arc<dyn EventSink<<DiceGame as GameVariant>::Selection, <DiceGame as GameVariant>::Outcome>>,
    ) -> WagerResult<Self> {
        config.validate()?;
        let game = DiceGame {
            min_target: config.dice.min_target,
            max_target: config.dice.max_target,
            base_house_edge: config.dice.base_house_edge,
        };
        let settings = config.engine_settings(config.dice.min_bet, config.dice.max_bet)?;
        Ok(Self::new(AccountId::from(config.dice.engine_id.as_str()), game, settings, collaborators, events))
    }

    pub fn set_target_bounds(&mut self, caller: &AccountId, min_target: u8, max_target: u8) -> WagerResult<()> {
        self.collaborators.access.require_capability(caller, Capability::Configure)?;
        self.game.set_target_bounds(min_target, max_target)
    }
}

impl WagerEngine<GridGame> {
    /// Combinatorial engine configured from `config.grid`
    pub fn grid(
        config: &WagerConfig,
        collaborators: Collaborators,
        events: Arc<dyn EventSink<<GridGame as GameVariant>::Selection, <GridGame as GameVariant>::Outcome>>,
    ) -> WagerResult<Self> {
        config.validate()?;
        let game = GridGame {
            house_edge: config.grid.house_edge,
        };
        let settings = config.engine_settings(config.grid.min_bet, config.grid.max_bet)?;
        Ok(Self::new(AccountId::from(config.grid.engine_id.as_str()), game, settings, collaborators, events))
    }
}
