//! Error types for the wagering engine
//!
//! Grouped the way callers need to react to them: validation and state
//! conflicts are rejected before anything changes, authorization failures are
//! surfaced from the collaborator that raised them, solvency failures can
//! happen at admission or at settlement.

use crate::common::types::{AccountId, RequestId};

/// Root error type for all engine operations
#[derive(Debug, thiserror::Error)]
pub enum WagerError {
    // Validation
    #[error("Invalid bet amount {amount}: must be within [{min}, {max}]")]
    InvalidBetAmount { amount: u64, min: u64, max: u64 },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Zero win probability for target {target}")]
    ZeroProbability { target: u8 },

    // State conflicts
    #[error("Roll already in progress for player {0}")]
    RollInProgress(AccountId),

    #[error("No bet in progress for player {0}")]
    NoBetInProgress(AccountId),

    #[error("Unknown or already fulfilled randomness request {0}")]
    UnknownRequest(RequestId),

    #[error("Randomness request {0} is already pending")]
    DuplicateRequest(RequestId),

    #[error("Request {request_id} has not expired yet (expires at {expires_at})")]
    RequestNotExpired {
        request_id: RequestId,
        expires_at: chrono::DateTime<chrono::Utc>,
    },

    #[error("Bet cancellation is disabled (no request expiry configured)")]
    CancellationDisabled,

    #[error("Invalid fulfillment: expected 1 random word, got {0}")]
    InvalidFulfillment(usize),

    // Authorization
    #[error("Game {0} is not registered with the platform")]
    GameNotRegistered(AccountId),

    #[error("Paused: {0}")]
    Paused(String),

    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("Account {0} is not authorized for this operation")]
    Unauthorized(AccountId),

    #[error("Fulfillment caller {0} is not the randomness oracle")]
    NotOracle(AccountId),

    // Solvency
    #[error("Insufficient engine balance: required {required}, available {available}")]
    InsufficientEngineBalance { required: u64, available: u64 },

    // Asset mismatch
    #[error("Asset value mismatch: {0}")]
    AssetValueMismatch(String),

    #[error("Arithmetic overflow computing {0}")]
    Overflow(&'static str),

    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Failures raised by external collaborators (ledgers, oracle, referral)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("Insufficient balance for {holder}: required {required}, available {available}")]
    InsufficientBalance {
        holder: AccountId,
        required: u64,
        available: u64,
    },

    #[error("Balance overflow for {holder}: cannot credit {amount}")]
    BalanceOverflow { holder: AccountId, amount: u64 },

    #[error("Insufficient allowance for {holder}: required {required}, approved {approved}")]
    InsufficientAllowance {
        holder: AccountId,
        required: u64,
        approved: u64,
    },

    #[error("Oracle request failed: {0}")]
    OracleUnavailable(String),

    #[error("Referral reward failed: {0}")]
    Referral(String),

    #[error("Unknown asset ledger: {0}")]
    UnknownLedger(String),
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

// Convenience type alias for Results
pub type WagerResult<T> = Result<T, WagerError>;
