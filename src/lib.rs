//! vrf-wager - Verifiable-Randomness Wagering Engine
//!
//! Players stake value on the outcome of an externally sourced random draw.
//! A bet is admitted and frozen, a randomness request is dispatched, and the
//! oracle's callback derives the outcome and settles the bet.
//!
//! Two variants share one engine:
//! - [`games::DiceGame`]: roll in `[1, 100]` against a target, over or under
//! - [`games::GridGame`]: pick 5 of 25 cells, paid by the number drawn
//!
//! The engine never talks to the outside world directly. Registration,
//! pausing, custody, randomness, referral and access control are injected
//! as [`common::traits::Collaborators`].

pub mod common;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod games;
pub mod logging;
pub mod oracle;

pub use common::types::{AccountId, Asset, Bet, RandomWord, RequestId, RollState};
pub use config::{ConfigLoader, WagerConfig};
pub use engine::{BetRequest, EngineStats, SettlementReport, WagerEngine};
pub use errors::{CollaboratorError, ConfigurationError, WagerError, WagerResult};
pub use events::{EngineEvent, EventSink};
pub use games::{CellMask, DiceGame, DiceSelection, Direction, GameVariant, GridGame, Payout};
pub use oracle::{FulfillmentDriver, VrfRandomnessOracle};
