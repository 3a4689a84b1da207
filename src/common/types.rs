//! Core data types shared by both game variants

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identity of a player, an engine instance, or a collaborator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Settlement asset a bet is staked and paid out in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "symbol", rename_all = "lowercase")]
pub enum Asset {
    /// The platform's native value, transferred alongside the call
    Native,
    /// A token pulled from the player's approved balance
    Token(String),
}

impl Asset {
    pub fn token(symbol: impl Into<String>) -> Self {
        Asset::Token(symbol.into())
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token(symbol) => write!(f, "token:{}", symbol),
        }
    }
}

/// Identifier handed out by the randomness oracle for a dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 256-bit unsigned random value, stored big-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RandomWord([u8; 32]);

impl RandomWord {
    pub const fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Exact `self mod modulus` over the full 256-bit value.
    ///
    /// Panics if `modulus` is zero, like integer `%`.
    pub fn rem_u64(&self, modulus: u64) -> u64 {
        assert!(modulus != 0, "modulus must be non-zero");
        let m = modulus as u128;
        let rem = self
            .0
            .iter()
            .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % m);
        rem as u64
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| format!("Invalid random word hex: {}", e))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "Random word must be 32 bytes".to_string())?;
        Ok(Self(arr))
    }
}

impl From<u64> for RandomWord {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Debug for RandomWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomWord(0x{})", self.to_hex())
    }
}

impl fmt::Display for RandomWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for RandomWord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RandomWord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RandomWord::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Frozen record of a single wager.
///
/// Created at admission and only replaced once settled or cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet<S> {
    pub stake: u64,
    pub selection: S,
    pub asset: Asset,
    /// House edge in effect at admission
    pub house_edge: u8,
    /// Winning payout (threshold) or pot (combinatorial) committed at admission
    pub committed_payout: u64,
    pub settled: bool,
    pub won: bool,
    pub payout: u64,
}

impl<S> Bet<S> {
    pub fn frozen(stake: u64, selection: S, asset: Asset, house_edge: u8, committed_payout: u64) -> Self {
        Self {
            stake,
            selection,
            asset,
            house_edge,
            committed_payout,
            settled: false,
            won: false,
            payout: 0,
        }
    }
}

/// Per-player roll state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RollState<O> {
    Unplayed,
    InProgress { request_id: RequestId },
    Settled { outcome: O },
}

impl<O> Default for RollState<O> {
    fn default() -> Self {
        RollState::Unplayed
    }
}

impl<O: Copy> RollState<O> {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, RollState::InProgress { .. })
    }

    /// Last derived outcome; `None` when never rolled or a roll is pending
    pub fn outcome(&self) -> Option<O> {
        match self {
            RollState::Settled { outcome } => Some(*outcome),
            _ => None,
        }
    }
}
