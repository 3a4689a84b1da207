//! Configuration management with validation and defaults
//!
//! Values come from an optional TOML file, then `VRF_WAGER_*` environment
//! variables, and are validated before an engine is built from them.

use crate::engine::{EngineSettings, StakeLimits};
use crate::errors::{ConfigurationError, WagerResult};
use crate::games::dice::{dynamic_house_edge, ROLL_SIDES};
use crate::games::{DiceGame, GameVariant};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Largest confirmation depth an oracle request may ask for
pub const MAX_REQUEST_CONFIRMATIONS: u16 = 200;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WagerConfig {
    /// Seconds a request may stay unfulfilled before it can be cancelled; 0 disables
    pub request_expiry_secs: u64,
    pub dice: DiceConfig,
    pub grid: GridConfig,
    pub oracle: OracleConfig,
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self {
            request_expiry_secs: 86_400,
            dice: DiceConfig::default(),
            grid: GridConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

/// Threshold game configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceConfig {
    pub engine_id: String,
    pub min_bet: u64,
    pub max_bet: u64,
    pub min_target: u8,
    pub max_target: u8,
    pub base_house_edge: u8,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            engine_id: "dice-engine".to_string(),
            min_bet: 1,
            max_bet: 1_000_000_000,
            min_target: 1,
            max_target: 100,
            base_house_edge: 1,
        }
    }
}

/// Combinatorial game configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub engine_id: String,
    pub min_bet: u64,
    pub max_bet: u64,
    pub house_edge: u8,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            engine_id: "grid-engine".to_string(),
            min_bet: 1,
            max_bet: 1_000_000_000,
            house_edge: 5,
        }
    }
}

/// Parameters forwarded with every randomness request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub callback_gas_limit: u32,
    pub request_confirmations: u16,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            callback_gas_limit: 200_000,
            request_confirmations: 3,
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> WagerResult<()> {
        if self.callback_gas_limit == 0 {
            return Err(invalid("oracle.callback_gas_limit", "0", "Gas limit cannot be zero"));
        }
        if self.request_confirmations == 0 || self.request_confirmations > MAX_REQUEST_CONFIRMATIONS {
            return Err(invalid(
                "oracle.request_confirmations",
                self.request_confirmations,
                format!("Must be within [1, {}]", MAX_REQUEST_CONFIRMATIONS),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> crate::errors::WagerError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl WagerConfig {
    /// Validate configuration values
    pub fn validate(&self) -> WagerResult<()> {
        if self.dice.engine_id.is_empty() {
            return Err(invalid("dice.engine_id", "", "Engine id cannot be empty"));
        }
        StakeLimits::new(self.dice.min_bet, self.dice.max_bet)?;
        DiceGame::default().set_target_bounds(self.dice.min_target, self.dice.max_target)?;
        if dynamic_house_edge(ROLL_SIDES - 1, self.dice.base_house_edge) >= 100 {
            return Err(invalid(
                "dice.base_house_edge",
                self.dice.base_house_edge,
                "Leaves no payout at high win probability",
            ));
        }

        if self.grid.engine_id.is_empty() {
            return Err(invalid("grid.engine_id", "", "Engine id cannot be empty"));
        }
        if self.grid.engine_id == self.dice.engine_id {
            return Err(invalid("grid.engine_id", &self.grid.engine_id, "Must differ from dice.engine_id"));
        }
        StakeLimits::new(self.grid.min_bet, self.grid.max_bet)?;
        crate::games::GridGame::default().set_house_edge(self.grid.house_edge)?;

        expiry_duration(self.request_expiry_secs)?;
        self.oracle.validate()
    }

    /// Engine settings for a variant with the given stake bounds
    pub fn engine_settings(&self, min_bet: u64, max_bet: u64) -> WagerResult<EngineSettings> {
        Ok(EngineSettings {
            limits: StakeLimits::new(min_bet, max_bet)?,
            oracle: self.oracle,
            request_expiry: expiry_duration(self.request_expiry_secs)?,
        })
    }
}

/// Request expiry for a number of seconds; 0 disables expiry
pub fn expiry_duration(secs: u64) -> WagerResult<Option<chrono::Duration>> {
    if secs == 0 {
        return Ok(None);
    }
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .map(Some)
        .ok_or_else(|| invalid("request_expiry_secs", secs, "Out of range"))
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> WagerResult<WagerConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            WagerConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        tracing::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> WagerResult<WagerConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut WagerConfig) -> WagerResult<()> {
        apply_overrides(config, |name| env::var(name).ok())
    }

    /// Save configuration to file
    pub fn save(&self, config: &WagerConfig, path: &str) -> WagerResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T: FromStr>(name: &str, value: String) -> WagerResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: name.to_string(),
            value,
            reason: format!("Cannot parse as {}", std::any::type_name::<T>()),
        }
        .into()
    })
}

fn apply_overrides(config: &mut WagerConfig, lookup: impl Fn(&str) -> Option<String>) -> WagerResult<()> {
    macro_rules! override_field {
        ($name:literal, $field:expr) => {
            if let Some(value) = lookup($name) {
                $field = parse_var($name, value)?;
            }
        };
    }

    // Dice overrides
    if let Some(id) = lookup("VRF_WAGER_DICE_ENGINE_ID") {
        config.dice.engine_id = id;
    }
    override_field!("VRF_WAGER_DICE_MIN_BET", config.dice.min_bet);
    override_field!("VRF_WAGER_DICE_MAX_BET", config.dice.max_bet);
    override_field!("VRF_WAGER_DICE_MIN_TARGET", config.dice.min_target);
    override_field!("VRF_WAGER_DICE_MAX_TARGET", config.dice.max_target);
    override_field!("VRF_WAGER_DICE_BASE_HOUSE_EDGE", config.dice.base_house_edge);

    // Grid overrides
    if let Some(id) = lookup("VRF_WAGER_GRID_ENGINE_ID") {
        config.grid.engine_id = id;
    }
    override_field!("VRF_WAGER_GRID_MIN_BET", config.grid.min_bet);
    override_field!("VRF_WAGER_GRID_MAX_BET", config.grid.max_bet);
    override_field!("VRF_WAGER_GRID_HOUSE_EDGE", config.grid.house_edge);

    // Oracle overrides
    override_field!("VRF_WAGER_ORACLE_CALLBACK_GAS_LIMIT", config.oracle.callback_gas_limit);
    override_field!("VRF_WAGER_ORACLE_REQUEST_CONFIRMATIONS", config.oracle.request_confirmations);

    override_field!("VRF_WAGER_REQUEST_EXPIRY_SECS", config.request_expiry_secs);

    Ok(())
}

/// Write the default configuration to `path`
pub fn generate_sample_config(path: &str) -> WagerResult<()> {
    ConfigLoader::new().save(&WagerConfig::default(), path)
}
