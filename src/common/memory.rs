//! In-memory collaborator implementations
//!
//! Used by the simulator binary and the test suites. Each one is thread-safe
//! so it can be shared behind an `Arc` with the fulfillment driver.

use crate::common::traits::{
    AccessControl, AssetLedger, AssetSupportRegistry, Capability, Clock, GameRegistry, PauseGate,
    RandomnessOracle, RandomnessRequest, ReferralCollaborator,
};
use crate::common::types::{AccountId, Asset, RequestId};
use crate::errors::{CollaboratorError, WagerError, WagerResult};
use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Registry backed by a set of registered game ids
#[derive(Default)]
pub struct InMemoryRegistry {
    registered: DashSet<AccountId>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, game: AccountId) {
        self.registered.insert(game);
    }

    pub fn unregister(&self, game: &AccountId) {
        self.registered.remove(game);
    }
}

impl GameRegistry for InMemoryRegistry {
    fn is_registered(&self, game: &AccountId) -> bool {
        self.registered.contains(game)
    }
}

/// Pause switch with a global flag and a per-game set
#[derive(Default)]
pub struct InMemoryPauseGate {
    global: AtomicBool,
    paused: DashSet<AccountId>,
}

impl InMemoryPauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_global(&self, paused: bool) {
        self.global.store(paused, Ordering::SeqCst);
    }

    pub fn pause(&self, game: AccountId) {
        self.paused.insert(game);
    }

    pub fn unpause(&self, game: &AccountId) {
        self.paused.remove(game);
    }
}

impl PauseGate for InMemoryPauseGate {
    fn require_not_paused(&self, caller: &AccountId) -> WagerResult<()> {
        if self.global.load(Ordering::SeqCst) {
            return Err(WagerError::Paused("platform is paused".to_string()));
        }
        if self.paused.contains(caller) {
            return Err(WagerError::Paused(format!("game {} is paused", caller)));
        }
        Ok(())
    }
}

/// Allow-list of supported assets
#[derive(Default)]
pub struct InMemoryAssetSupport {
    supported: DashSet<Asset>,
}

impl InMemoryAssetSupport {
    pub fn new(assets: impl IntoIterator<Item = Asset>) -> Self {
        let supported = DashSet::new();
        for asset in assets {
            supported.insert(asset);
        }
        Self { supported }
    }

    pub fn remove(&self, asset: &Asset) {
        self.supported.remove(asset);
    }
}

impl AssetSupportRegistry for InMemoryAssetSupport {
    fn require_supported(&self, asset: &Asset) -> WagerResult<()> {
        if self.supported.contains(asset) {
            Ok(())
        } else {
            Err(WagerError::UnsupportedAsset(asset.to_string()))
        }
    }
}

fn debit(balances: &DashMap<AccountId, u64>, holder: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
    let mut entry = balances.entry(holder.clone()).or_insert(0);
    if *entry < amount {
        return Err(CollaboratorError::InsufficientBalance {
            holder: holder.clone(),
            required: amount,
            available: *entry,
        });
    }
    *entry -= amount;
    Ok(())
}

fn credit(balances: &DashMap<AccountId, u64>, holder: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
    let mut entry = balances.entry(holder.clone()).or_insert(0);
    *entry = entry
        .checked_add(amount)
        .ok_or_else(|| CollaboratorError::BalanceOverflow {
            holder: holder.clone(),
            amount,
        })?;
    Ok(())
}

/// Move `amount` between two holders; on failure both balances are unchanged
fn transfer(
    balances: &DashMap<AccountId, u64>,
    from: &AccountId,
    to: &AccountId,
    amount: u64,
) -> Result<(), CollaboratorError> {
    debit(balances, from, amount)?;
    if let Err(e) = credit(balances, to, amount) {
        // `from` held at least `amount` a moment ago, so this cannot overflow
        if let Some(mut entry) = balances.get_mut(from) {
            *entry += amount;
        }
        return Err(e);
    }
    Ok(())
}

/// Native-value ledger: value moves with the call, no approval step
#[derive(Default)]
pub struct NativeLedger {
    balances: DashMap<AccountId, u64>,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&self, holder: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
        credit(&self.balances, holder, amount)
    }

    /// Remove funds from a holder outside the engine (e.g. treasury sweep)
    pub fn burn(&self, holder: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
        debit(&self.balances, holder, amount)
    }
}

impl AssetLedger for NativeLedger {
    fn transfer_in(&self, from: &AccountId, custodian: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
        transfer(&self.balances, from, custodian, amount)
    }

    fn transfer_out(&self, custodian: &AccountId, to: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
        transfer(&self.balances, custodian, to, amount)
    }

    fn balance_of(&self, holder: &AccountId) -> u64 {
        self.balances.get(holder).map(|b| *b).unwrap_or(0)
    }
}

/// Token ledger: pulls require a prior approval from the owner
pub struct TokenLedger {
    symbol: String,
    balances: DashMap<AccountId, u64>,
    allowances: DashMap<(AccountId, AccountId), u64>,
}

impl TokenLedger {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            balances: DashMap::new(),
            allowances: DashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn mint(&self, holder: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
        credit(&self.balances, holder, amount)
    }

    pub fn burn(&self, holder: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
        debit(&self.balances, holder, amount)
    }

    pub fn approve(&self, owner: &AccountId, spender: &AccountId, amount: u64) {
        self.allowances.insert((owner.clone(), spender.clone()), amount);
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u64 {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .map(|a| *a)
            .unwrap_or(0)
    }
}

impl AssetLedger for TokenLedger {
    fn transfer_in(&self, from: &AccountId, custodian: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
        let key = (from.clone(), custodian.clone());
        let approved = self.allowances.get(&key).map(|a| *a).unwrap_or(0);
        if approved < amount {
            return Err(CollaboratorError::InsufficientAllowance {
                holder: from.clone(),
                required: amount,
                approved,
            });
        }
        transfer(&self.balances, from, custodian, amount)?;
        self.allowances.insert(key, approved - amount);
        Ok(())
    }

    fn transfer_out(&self, custodian: &AccountId, to: &AccountId, amount: u64) -> Result<(), CollaboratorError> {
        transfer(&self.balances, custodian, to, amount)
    }

    fn balance_of(&self, holder: &AccountId) -> u64 {
        self.balances.get(holder).map(|b| *b).unwrap_or(0)
    }
}

/// Referral reward notification as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralReward {
    pub player: AccountId,
    pub stake: u64,
    pub asset: Asset,
}

/// Referral collaborator that records rewards, optionally failing every call
#[derive(Default)]
pub struct RecordingReferral {
    rewards: Mutex<Vec<ReferralReward>>,
    failing: AtomicBool,
}

impl RecordingReferral {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn rewards(&self) -> Vec<ReferralReward> {
        self.rewards.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ReferralCollaborator for RecordingReferral {
    fn add_reward(&self, player: &AccountId, stake: u64, asset: &Asset) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Referral("referral service unavailable".to_string()));
        }
        if let Ok(mut rewards) = self.rewards.lock() {
            rewards.push(ReferralReward {
                player: player.clone(),
                stake,
                asset: asset.clone(),
            });
        }
        Ok(())
    }
}

/// Access control backed by explicit grants
#[derive(Default)]
pub struct StaticAccessControl {
    grants: DashSet<(AccountId, Capability)>,
}

impl StaticAccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, account: AccountId, capability: Capability) {
        self.grants.insert((account, capability));
    }

    pub fn revoke(&self, account: &AccountId, capability: Capability) {
        self.grants.remove(&(account.clone(), capability));
    }
}

impl AccessControl for StaticAccessControl {
    fn require_capability(&self, caller: &AccountId, capability: Capability) -> WagerResult<()> {
        if self.grants.contains(&(caller.clone(), capability)) {
            Ok(())
        } else {
            Err(WagerError::Unauthorized(caller.clone()))
        }
    }
}

/// Oracle that only hands out sequential ids.
///
/// Fulfillment is driven by the caller, which makes it the oracle of choice
/// for tests that need to choose the random word.
pub struct ManualOracle {
    id: AccountId,
    next_id: AtomicU64,
    requests: Mutex<Vec<(RequestId, RandomnessRequest)>>,
    unavailable: AtomicBool,
}

impl ManualOracle {
    pub fn new(id: impl Into<AccountId>) -> Self {
        Self {
            id: id.into(),
            next_id: AtomicU64::new(1),
            requests: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<(RequestId, RandomnessRequest)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl RandomnessOracle for ManualOracle {
    fn id(&self) -> AccountId {
        self.id.clone()
    }

    fn request(&self, request: &RandomnessRequest) -> Result<RequestId, CollaboratorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::OracleUnavailable("oracle offline".to_string()));
        }
        let id = RequestId(self.next_id.fetch_add(1, Ordering::SeqCst));
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((id, request.clone()));
        }
        Ok(id)
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now = *now + by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|n| *n).unwrap_or_else(|_| Utc::now())
    }
}
