//! End-to-end bet lifecycle tests against in-memory collaborators
//!
//! The randomness oracle here only hands out request ids; each test delivers
//! the random word itself so outcomes are fixed.

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use vrf_wager::common::memory::{
    InMemoryAssetSupport, InMemoryPauseGate, InMemoryRegistry, ManualClock, ManualOracle, NativeLedger,
    RecordingReferral, StaticAccessControl, TokenLedger,
};
use vrf_wager::common::traits::{AssetLedger, AssetLedgers, Capability, Collaborators};
use vrf_wager::config::OracleConfig;
use vrf_wager::engine::{EngineSettings, StakeLimits};
use vrf_wager::events::MemoryEventSink;
use vrf_wager::games::grid::{self, CellMask};
use vrf_wager::{
    AccountId, Asset, BetRequest, CollaboratorError, DiceGame, DiceSelection, EngineEvent, GridGame,
    RandomWord, RequestId, RollState, WagerEngine, WagerError,
};

const ENGINE: &str = "engine";
const ORACLE: &str = "oracle";
/// Rolls 90 on the threshold game
const WORD_ROLLS_90: u64 = 123_456_789;

struct Harness {
    engine_id: AccountId,
    registry: Arc<InMemoryRegistry>,
    pause_gate: Arc<InMemoryPauseGate>,
    asset_support: Arc<InMemoryAssetSupport>,
    native: Arc<NativeLedger>,
    usdc: Arc<TokenLedger>,
    oracle: Arc<ManualOracle>,
    referral: Arc<RecordingReferral>,
    access: Arc<StaticAccessControl>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new(custody: u64) -> Self {
        let engine_id = AccountId::from(ENGINE);
        let registry = Arc::new(InMemoryRegistry::new());
        registry.register(engine_id.clone());

        let native = Arc::new(NativeLedger::new());
        let usdc = Arc::new(TokenLedger::new("USDC"));
        native.mint(&engine_id, custody).unwrap();
        usdc.mint(&engine_id, custody).unwrap();
        for player in ["alice", "bob"] {
            native.mint(&AccountId::from(player), 100_000).unwrap();
            usdc.mint(&AccountId::from(player), 100_000).unwrap();
        }

        let access = Arc::new(StaticAccessControl::new());
        access.grant(AccountId::from("admin"), Capability::Configure);
        access.grant(AccountId::from("operator"), Capability::Operator);

        Self {
            engine_id,
            registry,
            pause_gate: Arc::new(InMemoryPauseGate::new()),
            asset_support: Arc::new(InMemoryAssetSupport::new([Asset::Native, Asset::token("USDC")])),
            native,
            usdc,
            oracle: Arc::new(ManualOracle::new(ORACLE)),
            referral: Arc::new(RecordingReferral::new()),
            access,
            clock: Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            registry: self.registry.clone(),
            pause_gate: self.pause_gate.clone(),
            asset_support: self.asset_support.clone(),
            ledgers: AssetLedgers::new(self.native.clone()).with_token("USDC", self.usdc.clone()),
            oracle: self.oracle.clone(),
            referral: self.referral.clone(),
            access: self.access.clone(),
            clock: self.clock.clone(),
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            limits: StakeLimits::new(10, 10_000).unwrap(),
            oracle: OracleConfig::default(),
            request_expiry: Some(Duration::hours(1)),
        }
    }

    fn dice(&self) -> (WagerEngine<DiceGame>, Arc<MemoryEventSink<DiceSelection, u8>>) {
        let events: Arc<MemoryEventSink<DiceSelection, u8>> = Arc::new(MemoryEventSink::new());
        let engine = WagerEngine::new(
            self.engine_id.clone(),
            DiceGame::default(),
            Self::settings(),
            self.collaborators(),
            events.clone(),
        );
        (engine, events)
    }

    fn grid(&self) -> (WagerEngine<GridGame>, Arc<MemoryEventSink<CellMask, CellMask>>) {
        let events: Arc<MemoryEventSink<CellMask, CellMask>> = Arc::new(MemoryEventSink::new());
        let engine = WagerEngine::new(
            self.engine_id.clone(),
            GridGame::default(),
            Self::settings(),
            self.collaborators(),
            events.clone(),
        );
        (engine, events)
    }

    fn native_balance(&self, account: &str) -> u64 {
        self.native.balance_of(&AccountId::from(account))
    }
}

fn id(name: &str) -> AccountId {
    AccountId::from(name)
}

fn word(value: u64) -> [RandomWord; 1] {
    [RandomWord::from(value)]
}

#[test]
fn test_dice_winning_bet_end_to_end() {
    let h = Harness::new(1_000_000);
    let (mut engine, events) = h.dice();
    let alice = id("alice");

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    assert_eq!(h.native_balance("alice"), 99_000);
    assert_eq!(h.native_balance(ENGINE), 1_001_000);
    assert_eq!(h.oracle.requests()[0].1.num_words, 1);

    let report = engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap();
    assert_eq!(report.outcome, 90);
    assert!(report.payout.won);
    assert_eq!(report.payout.amount, 1_840);

    assert_eq!(h.native_balance("alice"), 100_840);
    assert_eq!(h.native_balance(ENGINE), 999_160);
    assert_eq!(engine.latest_outcome(&alice), Some(90));
    assert!(!engine.is_roll_in_progress(&alice));

    let bet = engine.current_bet(&alice).unwrap();
    assert!(bet.settled && bet.won);
    assert_eq!(bet.payout, 1_840);
    assert_eq!(bet.stake, 1_000);

    let names: Vec<&str> = events.events().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["roll_requested", "roll_fulfilled", "bet_settled"]);

    let rewards = h.referral.rewards();
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0].stake, 1_000);

    let stats = engine.stats();
    assert_eq!(stats.bets_admitted, 1);
    assert_eq!(stats.bets_won, 1);
    assert_eq!(stats.total_paid_out, 1_840);
}

#[test]
fn test_dice_losing_bet_keeps_stake() {
    let h = Harness::new(1_000_000);
    let (mut engine, events) = h.dice();
    let alice = id("alice");

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::under(50)))
        .unwrap();
    let report = engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap();

    assert_eq!(report.outcome, 90);
    assert!(!report.payout.won);
    assert_eq!(h.native_balance("alice"), 99_000);
    assert_eq!(h.native_balance(ENGINE), 1_001_000);
    assert!(!engine.current_bet(&alice).unwrap().won);

    // Referral is notified on losses too
    assert_eq!(h.referral.rewards().len(), 1);
    match events.events().last() {
        Some(EngineEvent::BetSettled { won, payout, outcome, .. }) => {
            assert!(!won);
            assert_eq!(*payout, 0);
            assert_eq!(*outcome, 90);
        }
        other => panic!("Expected bet_settled, got {:?}", other),
    }
}

#[test]
fn test_grid_golden_draw_through_engine() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.grid();

    let full = grid::pack(&[24, 22, 17, 16, 14]).unwrap();
    let partial = grid::pack(&[14, 16, 17, 0, 1]).unwrap();

    let first = engine.place_bet(BetRequest::native("alice", 1_000, full)).unwrap();
    let second = engine.place_bet(BetRequest::native("bob", 1_000, partial)).unwrap();
    assert_eq!(engine.current_bet(&id("alice")).unwrap().committed_payout, 1_900);

    let report = engine.fulfill_random_words(&id(ORACLE), first, &word(72)).unwrap();
    assert_eq!(report.outcome.bits(), 0x143_4000);
    assert_eq!(grid::unpack(report.outcome), vec![14, 16, 17, 22, 24]);
    assert_eq!(report.payout.amount, 1_900);

    let report = engine.fulfill_random_words(&id(ORACLE), second, &word(72)).unwrap();
    assert_eq!(report.payout.amount, 1_330);

    assert_eq!(h.native_balance("alice"), 100_900);
    assert_eq!(h.native_balance("bob"), 100_330);
    assert_eq!(engine.latest_outcome(&id("bob")), Some(CellMask::from_bits(0x143_4000)));
}

#[test]
fn test_grid_rejects_wrong_cell_count() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.grid();

    for bits in [0b1111u32, 0b11_1111, 0b1111 | 1 << 25] {
        let err = engine
            .place_bet(BetRequest::native("alice", 1_000, CellMask::from_bits(bits)))
            .unwrap_err();
        assert!(matches!(err, WagerError::InvalidSelection(_)), "{:#x}: {:?}", bits, err);
    }
    assert_eq!(h.native_balance("alice"), 100_000);
}

#[test]
fn test_second_admission_rejected_while_in_progress() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();
    let alice = id("alice");
    h.usdc.approve(&alice, &h.engine_id, 5_000);

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    assert!(engine.is_roll_in_progress(&alice));
    assert_eq!(engine.latest_outcome(&alice), None);
    assert_eq!(engine.roll_state(&alice), RollState::InProgress { request_id });

    let attempts = [
        BetRequest::native("alice", 1_000, DiceSelection::over(50)),
        BetRequest::native("alice", 500, DiceSelection::under(20)),
        BetRequest::token("alice", "USDC", 2_000, DiceSelection::over(10)),
    ];
    for attempt in attempts {
        let err = engine.place_bet(attempt).unwrap_err();
        assert!(matches!(err, WagerError::RollInProgress(ref p) if *p == alice), "{:?}", err);
    }
    assert_eq!(h.native_balance("alice"), 99_000);
    assert_eq!(h.usdc.balance_of(&alice), 100_000);
    assert_eq!(engine.pending_count(), 1);

    // Other players are independent
    engine
        .place_bet(BetRequest::native("bob", 1_000, DiceSelection::over(50)))
        .unwrap();

    engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap();
    engine
        .place_bet(BetRequest::token("alice", "USDC", 2_000, DiceSelection::over(10)))
        .unwrap();
}

#[test]
fn test_stake_bounds_are_inclusive() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();

    assert!(engine.place_bet(BetRequest::native("alice", 10, DiceSelection::over(50))).is_ok());
    assert!(engine.place_bet(BetRequest::native("bob", 10_000, DiceSelection::over(50))).is_ok());

    let (mut engine, _events) = h.dice();
    for stake in [9, 10_001] {
        let err = engine
            .place_bet(BetRequest::native("alice", stake, DiceSelection::over(50)))
            .unwrap_err();
        assert!(matches!(err, WagerError::InvalidBetAmount { amount, min: 10, max: 10_000 } if amount == stake));
    }
}

#[test]
fn test_invalid_dice_targets() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();

    for selection in [DiceSelection::over(100), DiceSelection::under(1), DiceSelection::over(0)] {
        let err = engine
            .place_bet(BetRequest::native("alice", 1_000, selection))
            .unwrap_err();
        assert!(matches!(err, WagerError::InvalidSelection(_)), "{:?}", selection);
    }

    engine.set_target_bounds(&id("admin"), 20, 80).unwrap();
    assert!(engine.place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(81))).is_err());
    assert!(engine.place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(80))).is_ok());
}

#[test]
fn test_asset_value_mismatch() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();

    let mut underpaid = BetRequest::native("alice", 1_000, DiceSelection::over(50));
    underpaid.value_sent = 900;
    assert!(matches!(
        engine.place_bet(underpaid),
        Err(WagerError::AssetValueMismatch(_))
    ));

    let mut token_with_value = BetRequest::token("alice", "USDC", 1_000, DiceSelection::over(50));
    token_with_value.value_sent = 5;
    assert!(matches!(
        engine.place_bet(token_with_value),
        Err(WagerError::AssetValueMismatch(_))
    ));

    // Declared stake of zero takes the value sent
    let mut implicit = BetRequest::native("alice", 0, DiceSelection::over(50));
    implicit.value_sent = 700;
    engine.place_bet(implicit).unwrap();
    assert_eq!(engine.current_bet(&id("alice")).unwrap().stake, 700);
    assert_eq!(h.native_balance("alice"), 99_300);
}

#[test]
fn test_token_bet_requires_allowance() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();
    let alice = id("alice");

    let err = engine
        .place_bet(BetRequest::token("alice", "USDC", 1_000, DiceSelection::over(50)))
        .unwrap_err();
    assert!(matches!(
        err,
        WagerError::Collaborator(CollaboratorError::InsufficientAllowance { approved: 0, .. })
    ));
    assert!(!engine.is_roll_in_progress(&alice));
    assert_eq!(engine.pending_count(), 0);

    h.usdc.approve(&alice, &h.engine_id, 1_000);
    let request_id = engine
        .place_bet(BetRequest::token("alice", "USDC", 1_000, DiceSelection::over(50)))
        .unwrap();
    engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap();

    assert_eq!(h.usdc.balance_of(&alice), 100_840);
    assert_eq!(h.native_balance("alice"), 100_000);
    assert_eq!(h.referral.rewards()[0].asset, Asset::token("USDC"));
}

#[test]
fn test_insolvent_admission_rejected() {
    let h = Harness::new(500);
    let (mut engine, _events) = h.dice();

    let err = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap_err();
    assert!(matches!(
        err,
        WagerError::InsufficientEngineBalance { required: 1_840, available: 1_500 }
    ));
    assert_eq!(h.native_balance("alice"), 100_000);

    // under(50): probability 49, edge 8, multiplier 187 -> 187 <= 500 + 100
    engine
        .place_bet(BetRequest::native("alice", 100, DiceSelection::under(50)))
        .unwrap();
}

#[test]
fn test_insolvent_settlement_fails_atomically_and_can_be_redelivered() {
    let h = Harness::new(1_000_000);
    let (mut engine, events) = h.dice();
    let alice = id("alice");

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    h.native.burn(&h.engine_id, h.native_balance(ENGINE)).unwrap();

    let err = engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap_err();
    assert!(matches!(
        err,
        WagerError::InsufficientEngineBalance { required: 1_840, available: 0 }
    ));
    assert!(engine.is_roll_in_progress(&alice));
    assert_eq!(engine.pending_count(), 1);
    assert_eq!(engine.stats().bets_settled, 0);
    assert_eq!(events.events().len(), 1);
    assert!(h.referral.rewards().is_empty());

    h.native.mint(&h.engine_id, 10_000).unwrap();
    let report = engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap();
    assert_eq!(report.payout.amount, 1_840);
    assert_eq!(h.native_balance("alice"), 100_840);
    assert_eq!(h.native_balance(ENGINE), 8_160);
}

#[test]
fn test_fulfillment_is_exactly_once() {
    let h = Harness::new(1_000_000);
    let (mut engine, events) = h.dice();

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap();

    let err = engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap_err();
    assert!(matches!(err, WagerError::UnknownRequest(r) if r == request_id));
    assert_eq!(h.native_balance("alice"), 100_840);
    assert_eq!(events.events().len(), 3);

    assert!(matches!(
        engine.fulfill_random_words(&id(ORACLE), RequestId(404), &word(1)),
        Err(WagerError::UnknownRequest(RequestId(404)))
    ));
}

#[test]
fn test_fulfillment_caller_and_word_count_checked() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();
    let alice = id("alice");

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();

    let err = engine
        .fulfill_random_words(&id("mallory"), request_id, &word(WORD_ROLLS_90))
        .unwrap_err();
    assert!(matches!(err, WagerError::NotOracle(ref caller) if caller.as_str() == "mallory"));

    assert!(matches!(
        engine.fulfill_random_words(&id(ORACLE), request_id, &[]),
        Err(WagerError::InvalidFulfillment(0))
    ));
    let two = [RandomWord::from(1), RandomWord::from(2)];
    assert!(matches!(
        engine.fulfill_random_words(&id(ORACLE), request_id, &two),
        Err(WagerError::InvalidFulfillment(2))
    ));

    assert!(engine.is_roll_in_progress(&alice));
    assert!(engine.pending_request(&request_id).is_some());
}

#[test]
fn test_failing_referral_does_not_block_settlement() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();
    h.referral.set_failing(true);

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    let report = engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap();

    assert_eq!(report.payout.amount, 1_840);
    assert_eq!(h.native_balance("alice"), 100_840);
    assert!(h.referral.rewards().is_empty());
}

#[test]
fn test_house_edge_frozen_at_admission() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();
    let admin = id("admin");

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    engine.set_house_edge(&admin, 10).unwrap();

    let report = engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap();
    assert_eq!(report.payout.amount, 1_840);
    assert_eq!(report.bet.house_edge, 1);

    // New bets use the new edge: 10 + 7 = 17, 100 * 83 / 50 = 166
    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    let report = engine
        .fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90))
        .unwrap();
    assert_eq!(report.payout.amount, 1_660);
}

#[test]
fn test_grid_pot_frozen_at_admission() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.grid();

    let selection = grid::pack(&[14, 16, 17, 22, 24]).unwrap();
    let request_id = engine.place_bet(BetRequest::native("alice", 1_000, selection)).unwrap();
    engine.set_house_edge(&id("admin"), 50).unwrap();

    let report = engine.fulfill_random_words(&id(ORACLE), request_id, &word(72)).unwrap();
    assert_eq!(report.payout.amount, 1_900);
}

#[test]
fn test_expired_bet_cancellation() {
    let h = Harness::new(1_000_000);
    let (mut engine, events) = h.dice();
    let alice = id("alice");

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();

    assert!(matches!(
        engine.cancel_expired_bet(&alice, &alice),
        Err(WagerError::RequestNotExpired { .. })
    ));

    h.clock.advance(Duration::hours(1));
    assert!(matches!(
        engine.cancel_expired_bet(&id("bob"), &alice),
        Err(WagerError::Unauthorized(_))
    ));

    let refund = engine.cancel_expired_bet(&id("operator"), &alice).unwrap();
    assert_eq!(refund, 1_000);
    assert_eq!(h.native_balance("alice"), 100_000);
    assert_eq!(h.native_balance(ENGINE), 1_000_000);
    assert_eq!(engine.roll_state(&alice), RollState::Unplayed);
    assert_eq!(engine.stats().bets_cancelled, 1);

    // A late callback finds nothing to settle
    assert!(matches!(
        engine.fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90)),
        Err(WagerError::UnknownRequest(_))
    ));
    assert!(matches!(
        events.events().last(),
        Some(EngineEvent::BetCancelled { refund: 1_000, .. })
    ));

    assert!(matches!(
        engine.cancel_expired_bet(&alice, &alice),
        Err(WagerError::NoBetInProgress(_))
    ));
}

#[test]
fn test_player_cancels_own_bet_and_keeps_last_outcome() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();
    let alice = id("alice");

    let first = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    engine
        .fulfill_random_words(&id(ORACLE), first, &word(WORD_ROLLS_90))
        .unwrap();

    engine
        .place_bet(BetRequest::native("alice", 500, DiceSelection::over(50)))
        .unwrap();
    h.clock.advance(Duration::hours(2));
    assert_eq!(engine.cancel_expired_bet(&alice, &alice).unwrap(), 500);

    assert_eq!(engine.latest_outcome(&alice), Some(90));
    let restored = engine.current_bet(&alice).unwrap();
    assert!(restored.settled && restored.won);
    assert_eq!(restored.stake, 1_000);
    assert_eq!(restored.payout, 1_840);
    engine
        .place_bet(BetRequest::native("alice", 500, DiceSelection::over(50)))
        .unwrap();
}

#[test]
fn test_cancellation_disabled_without_expiry() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();
    let alice = id("alice");

    engine.set_request_expiry(&id("admin"), None).unwrap();
    engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    h.clock.advance(Duration::days(365));

    assert!(matches!(
        engine.cancel_expired_bet(&alice, &alice),
        Err(WagerError::CancellationDisabled)
    ));
    assert!(engine.is_roll_in_progress(&alice));
}

#[test]
fn test_platform_gates() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();
    let bet = || BetRequest::native("alice", 1_000, DiceSelection::over(50));

    h.pause_gate.pause(h.engine_id.clone());
    assert!(matches!(engine.place_bet(bet()), Err(WagerError::Paused(_))));
    h.pause_gate.unpause(&h.engine_id);

    h.pause_gate.set_global(true);
    assert!(matches!(engine.place_bet(bet()), Err(WagerError::Paused(_))));
    h.pause_gate.set_global(false);

    h.registry.unregister(&h.engine_id);
    assert!(matches!(engine.place_bet(bet()), Err(WagerError::GameNotRegistered(_))));
    h.registry.register(h.engine_id.clone());

    let dai = BetRequest::token("alice", "DAI", 1_000, DiceSelection::over(50));
    assert!(matches!(engine.place_bet(dai), Err(WagerError::UnsupportedAsset(_))));

    h.asset_support.remove(&Asset::token("USDC"));
    let usdc = BetRequest::token("alice", "USDC", 1_000, DiceSelection::over(50));
    assert!(matches!(engine.place_bet(usdc), Err(WagerError::UnsupportedAsset(_))));

    assert_eq!(h.native_balance("alice"), 100_000);
    assert!(engine.place_bet(bet()).is_ok());
}

#[test]
fn test_oracle_failure_refunds_stake() {
    let h = Harness::new(1_000_000);
    let (mut engine, events) = h.dice();
    h.oracle.set_unavailable(true);

    let err = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap_err();
    assert!(matches!(
        err,
        WagerError::Collaborator(CollaboratorError::OracleUnavailable(_))
    ));
    assert_eq!(h.native_balance("alice"), 100_000);
    assert_eq!(h.native_balance(ENGINE), 1_000_000);
    assert!(!engine.is_roll_in_progress(&id("alice")));
    assert!(events.events().is_empty());
}

#[test]
fn test_privileged_setters_require_configure() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();
    let alice = id("alice");
    let admin = id("admin");

    assert!(matches!(engine.set_stake_limits(&alice, 1, 5), Err(WagerError::Unauthorized(_))));
    assert!(matches!(engine.set_house_edge(&alice, 2), Err(WagerError::Unauthorized(_))));
    assert!(matches!(engine.set_target_bounds(&alice, 5, 95), Err(WagerError::Unauthorized(_))));
    assert!(matches!(engine.set_oracle_params(&alice, 1, 1), Err(WagerError::Unauthorized(_))));
    assert!(matches!(engine.set_request_expiry(&alice, Some(60)), Err(WagerError::Unauthorized(_))));
    assert!(matches!(
        engine.set_oracle(&alice, Arc::new(ManualOracle::new("rogue"))),
        Err(WagerError::Unauthorized(_))
    ));

    engine.set_stake_limits(&admin, 100, 200).unwrap();
    assert_eq!(engine.settings().limits, StakeLimits { min_bet: 100, max_bet: 200 });
    assert!(engine.set_stake_limits(&admin, 300, 200).is_err());
    assert!(matches!(
        engine.place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50))),
        Err(WagerError::InvalidBetAmount { .. })
    ));

    assert!(matches!(
        engine.set_oracle_params(&admin, 0, 3),
        Err(WagerError::Configuration(_))
    ));
    engine.set_oracle_params(&admin, 500_000, 10).unwrap();
    engine
        .place_bet(BetRequest::native("alice", 150, DiceSelection::over(50)))
        .unwrap();
    let (_, request) = h.oracle.requests().pop().unwrap();
    assert_eq!(request.callback_gas_limit, 500_000);
    assert_eq!(request.request_confirmations, 10);
    assert_eq!(request.requester, h.engine_id);
}

#[test]
fn test_replaced_oracle_takes_over_delivery() {
    let h = Harness::new(1_000_000);
    let (mut engine, _events) = h.dice();

    let request_id = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    engine
        .set_oracle(&id("admin"), Arc::new(ManualOracle::new("oracle-2")))
        .unwrap();

    assert!(matches!(
        engine.fulfill_random_words(&id(ORACLE), request_id, &word(WORD_ROLLS_90)),
        Err(WagerError::NotOracle(_))
    ));
    engine
        .fulfill_random_words(&id("oracle-2"), request_id, &word(WORD_ROLLS_90))
        .unwrap();
}

#[test]
fn test_reissued_request_id_does_not_displace_pending_bet() {
    let h = Harness::new(1_000_000);
    let (mut engine, events) = h.dice();
    let alice = id("alice");
    let bob = id("bob");

    let alice_request = engine
        .place_bet(BetRequest::native("alice", 1_000, DiceSelection::over(50)))
        .unwrap();
    // The replacement oracle numbers its requests from 1 again
    let replacement = Arc::new(ManualOracle::new("oracle-2"));
    engine.set_oracle(&id("admin"), replacement.clone()).unwrap();

    let err = engine
        .place_bet(BetRequest::native("bob", 1_000, DiceSelection::over(50)))
        .unwrap_err();
    assert!(matches!(err, WagerError::DuplicateRequest(r) if r == alice_request));
    assert_eq!(h.native_balance("bob"), 100_000);
    assert!(!engine.is_roll_in_progress(&bob));
    assert_eq!(engine.pending_count(), 1);
    assert_eq!(engine.pending_request(&alice_request).unwrap().player, alice);
    assert_eq!(engine.stats().bets_admitted, 1);
    assert_eq!(events.events().len(), 1);

    let bob_request = engine
        .place_bet(BetRequest::native("bob", 1_000, DiceSelection::over(50)))
        .unwrap();
    assert_ne!(bob_request, alice_request);
    assert_eq!(replacement.requests().len(), 2);

    h.clock.advance(Duration::hours(1));
    assert_eq!(engine.cancel_expired_bet(&alice, &alice).unwrap(), 1_000);
    assert_eq!(h.native_balance("alice"), 100_000);
    assert!(!engine.is_roll_in_progress(&alice));

    let report = engine
        .fulfill_random_words(&id("oracle-2"), bob_request, &word(WORD_ROLLS_90))
        .unwrap();
    assert_eq!(report.player, bob);
    assert_eq!(h.native_balance("bob"), 100_840);
    assert_eq!(engine.pending_count(), 0);
}
