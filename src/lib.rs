//! Cash-and-carry arbitrage bot for clearing-term spreads
//!
//! Watches one exchange feed for the same security under two settlement
//! terms (spot "CI" and forward "48hs"), reconstructs the implied annualized
//! funding rate of the spread and fires a paired buy/sell order when the
//! rate clears the configured threshold.

pub mod broker;
pub mod core;
pub mod dispatch;
pub mod engine;
pub mod feed;
pub mod infrastructure;
pub mod ledger;

// Re-export commonly used types
pub use infrastructure::config::{AccountConfig, Config, StrategyConfig, VenueConfig};

use thiserror::Error;

/// Main error type for the bot
#[derive(Error, Debug)]
pub enum ArbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(#[from] broker::SessionError),

    #[error("Account error: {0}")]
    Account(#[from] broker::AccountError),

    #[error("Feed error: {0}")]
    Feed(#[from] feed::FeedError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ArbError>;
