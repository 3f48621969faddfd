//! Push feed wire format
//!
//! The venue pushes market-data and order-report messages over one
//! WebSocket. Market data carries best bid/offer arrays that are empty or
//! a single `{price, size}` entry; anything missing degrades to the zero
//! sentinel so a sparse tick never becomes an error.

pub mod connection;

pub use connection::{FeedConnection, run_feed};

use crate::core::instrument::parse_instrument;
use crate::core::{QuoteUpdate, Term};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Feed failures
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("timeout")]
    Timeout,
    #[error("not connected")]
    NotConnected,
}

/// One push message off the wire
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PushMessage {
    #[serde(rename = "Md")]
    MarketData(MarketDataMessage),
    #[serde(rename = "or")]
    OrderReport {
        #[serde(rename = "orderReport")]
        order_report: OrderReport,
    },
}

/// Market-data push for one instrument
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MarketDataMessage {
    #[serde(rename = "instrumentId")]
    pub instrument_id: InstrumentId,
    #[serde(rename = "marketData", default)]
    pub market_data: MarketDataBlock,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InstrumentId {
    pub symbol: String,
    #[serde(rename = "marketId", default)]
    pub market_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MarketDataBlock {
    #[serde(rename = "BI", default)]
    pub bids: Vec<BookEntry>,
    #[serde(rename = "OF", default)]
    pub offers: Vec<BookEntry>,
}

/// Book level; either field may be missing on a sparse tick
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BookEntry {
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Asynchronous fill/non-fill report for one of our orders
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OrderReport {
    #[serde(rename = "clOrdId")]
    pub client_order_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "originatingUsername")]
    pub originating_username: Option<String>,
}

impl MarketDataMessage {
    /// Normalize into a (symbol, term) observation.
    ///
    /// Only the decision side of the book is read: the offer for a spot
    /// instrument, the bid for a forward one. Returns None when the
    /// instrument id does not parse.
    pub fn normalize(&self) -> Option<QuoteUpdate> {
        let (ticker, term) = parse_instrument(&self.instrument_id.symbol)?;

        let mut bid = Decimal::ZERO;
        let mut offer = Decimal::ZERO;
        let mut size = 0u64;

        match term {
            Term::Spot => {
                if let Some(entry) = self.market_data.offers.first() {
                    offer = entry.price.unwrap_or(Decimal::ZERO);
                    size = entry.size.unwrap_or(0);
                }
            }
            Term::Forward => {
                if let Some(entry) = self.market_data.bids.first() {
                    bid = entry.price.unwrap_or(Decimal::ZERO);
                    size = entry.size.unwrap_or(0);
                }
            }
        }

        Some(QuoteUpdate {
            symbol: ticker.to_string(),
            term,
            bid,
            offer,
            size,
        })
    }
}

/// Parse one frame; unknown message types come back as an error the caller
/// logs and skips
pub fn parse_push(text: &str) -> Result<PushMessage, serde_json::Error> {
    serde_json::from_str(text)
}
