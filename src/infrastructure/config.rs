//! Configuration management
//!
//! Loads configuration from config.toml at startup. All tunable values
//! live here; credentials come from the environment, never from the file.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bot configuration
///
/// Loaded from config.toml at startup. A missing file means defaults;
/// a present but unparseable file is a startup error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Strategy settings
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Account settings
    #[serde(default)]
    pub account: AccountConfig,

    /// Venue endpoints
    #[serde(default)]
    pub venue: VenueConfig,
}

/// Strategy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Annualized rate threshold (percent) that triggers a pair
    #[serde(default = "default_tna_expected")]
    pub tna_expected: Decimal,

    /// Tickers watched under both settlement terms
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,

    /// Submit push-style instead of confirming inline
    #[serde(default)]
    pub streaming: bool,
}

/// Account configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    /// Operable budget
    #[serde(default = "default_budget")]
    pub budget: Decimal,

    /// Commission rate, percent of notional
    #[serde(default = "default_commission_pct")]
    pub commission_pct: Decimal,

    /// Market-right rate, percent of notional
    #[serde(default = "default_market_right_pct")]
    pub market_right_pct: Decimal,
}

/// Venue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VenueConfig {
    /// Production environment; requires explicit confirmation at startup
    #[serde(default)]
    pub prod: bool,

    /// REST base url (trailing slash matters for joins)
    #[serde(default = "default_rest_url")]
    pub rest_url: String,

    /// Push feed url
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Originating-user tag stamped on our order reports
    #[serde(default = "default_proprietary")]
    pub proprietary: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            tna_expected: default_tna_expected(),
            tickers: default_tickers(),
            streaming: false,
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            commission_pct: default_commission_pct(),
            market_right_pct: default_market_right_pct(),
        }
    }
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            prod: false,
            rest_url: default_rest_url(),
            ws_url: default_ws_url(),
            proprietary: default_proprietary(),
        }
    }
}

fn default_tna_expected() -> Decimal {
    Decimal::from(110)
}

fn default_tickers() -> Vec<String> {
    ["ALUA", "BMA", "BYMA", "COME", "CRES", "GGAL", "PAMP", "YPFD"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_budget() -> Decimal {
    Decimal::from(100_000)
}

fn default_commission_pct() -> Decimal {
    Decimal::new(15, 2) // 0.15%
}

fn default_market_right_pct() -> Decimal {
    Decimal::new(8, 2) // 0.08%
}

fn default_rest_url() -> String {
    "https://api.remarkets.primary.com.ar/".to_string()
}

fn default_ws_url() -> String {
    "wss://api.remarkets.primary.com.ar/".to_string()
}

fn default_proprietary() -> String {
    "PBCP".to_string()
}

impl Config {
    /// Load configuration from a config.toml file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config = toml::from_str(&contents)
                    .map_err(|e| ConfigError::ParseError(e.to_string()))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File not found - use defaults
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Startup validation; anything wrong here terminates the process
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.budget <= Decimal::ZERO {
            return Err(ConfigError::Invalid("budget has to be greater than zero"));
        }
        if self.strategy.tickers.is_empty() {
            return Err(ConfigError::Invalid("watchlist is empty"));
        }
        if self.account.commission_pct < Decimal::ZERO
            || self.account.market_right_pct < Decimal::ZERO
        {
            return Err(ConfigError::Invalid("fee rates cannot be negative"));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading file
    IoError(std::io::Error),
    /// Parse error (invalid TOML)
    ParseError(String),
    /// Validation failure
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            _ => None,
        }
    }
}
