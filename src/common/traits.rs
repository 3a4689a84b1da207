//! Collaborator capabilities the engine calls into
//!
//! Registration, pausing, asset support, custody, randomness, referral and
//! access control all live outside the engine. Each is injected as a trait
//! object so deployments and tests can supply their own.

use crate::common::types::{AccountId, Asset, RequestId};
use crate::errors::{CollaboratorError, WagerError, WagerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Platform registry of game instances
pub trait GameRegistry: Send + Sync {
    fn is_registered(&self, game: &AccountId) -> bool;
}

/// Global and per-game pause switch
pub trait PauseGate: Send + Sync {
    /// Fails with [`WagerError::Paused`] if the platform or `caller` is paused
    fn require_not_paused(&self, caller: &AccountId) -> WagerResult<()>;
}

/// Registry of assets bets may be settled in
pub trait AssetSupportRegistry: Send + Sync {
    fn require_supported(&self, asset: &Asset) -> WagerResult<()>;
}

/// Custody ledger for a single asset
pub trait AssetLedger: Send + Sync {
    /// Move `amount` from `from` into `custodian`'s holdings
    fn transfer_in(&self, from: &AccountId, custodian: &AccountId, amount: u64) -> Result<(), CollaboratorError>;

    /// Move `amount` out of `custodian`'s holdings to `to`
    fn transfer_out(&self, custodian: &AccountId, to: &AccountId, amount: u64) -> Result<(), CollaboratorError>;

    fn balance_of(&self, holder: &AccountId) -> u64;
}

/// Parameters of a randomness request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequest {
    pub requester: AccountId,
    pub num_words: u32,
    pub callback_gas_limit: u32,
    pub request_confirmations: u16,
}

/// External source of verifiable randomness.
///
/// `request` returns immediately; the oracle later calls the engine's
/// fulfillment entry point once with one random word for that id.
pub trait RandomnessOracle: Send + Sync {
    /// Identity the oracle fulfills requests as
    fn id(&self) -> AccountId;

    fn request(&self, request: &RandomnessRequest) -> Result<RequestId, CollaboratorError>;
}

/// Referral bookkeeping, notified of every settled stake
pub trait ReferralCollaborator: Send + Sync {
    fn add_reward(&self, player: &AccountId, stake: u64, asset: &Asset) -> Result<(), CollaboratorError>;
}

/// Capabilities checked by [`AccessControl`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Change bounds, house edge, oracle parameters
    Configure,
    /// Cancel expired bets on behalf of players
    Operator,
}

/// Privileged-operation gate
pub trait AccessControl: Send + Sync {
    fn require_capability(&self, caller: &AccountId, capability: Capability) -> WagerResult<()>;
}

/// Time source for request expiry
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Asset ledgers keyed by asset reference
#[derive(Clone)]
pub struct AssetLedgers {
    native: Arc<dyn AssetLedger>,
    tokens: HashMap<String, Arc<dyn AssetLedger>>,
}

impl AssetLedgers {
    pub fn new(native: Arc<dyn AssetLedger>) -> Self {
        Self {
            native,
            tokens: HashMap::new(),
        }
    }

    pub fn with_token(mut self, symbol: impl Into<String>, ledger: Arc<dyn AssetLedger>) -> Self {
        self.tokens.insert(symbol.into(), ledger);
        self
    }

    /// Ledger responsible for `asset`
    pub fn resolve(&self, asset: &Asset) -> WagerResult<Arc<dyn AssetLedger>> {
        match asset {
            Asset::Native => Ok(self.native.clone()),
            Asset::Token(symbol) => self
                .tokens
                .get(symbol)
                .cloned()
                .ok_or_else(|| WagerError::UnsupportedAsset(asset.to_string())),
        }
    }
}

/// Everything the engine talks to outside its own state
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn GameRegistry>,
    pub pause_gate: Arc<dyn PauseGate>,
    pub asset_support: Arc<dyn AssetSupportRegistry>,
    pub ledgers: AssetLedgers,
    pub oracle: Arc<dyn RandomnessOracle>,
    pub referral: Arc<dyn ReferralCollaborator>,
    pub access: Arc<dyn AccessControl>,
    pub clock: Arc<dyn Clock>,
}
