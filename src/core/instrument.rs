//! Instrument identifiers: clearing terms, order sides and the full
//! exchange instrument id
//!
//! The exchange names every instrument as
//! `"<EXCHANGE> - <SEGMENT> - <TICKER> - <TERM>"`; only the last two
//! tokens carry information this engine cares about.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between tokens of a full instrument id
const ID_SEPARATOR: &str = " - ";

/// Exchange prefix for the market segment this bot trades
const ID_PREFIX: &str = "MERV - XMEV";

/// Settlement term of a quote or order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// Immediate settlement ("CI")
    Spot,
    /// T+2 settlement ("48hs")
    Forward,
}

impl Term {
    /// Wire name as the exchange spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Term::Spot => "CI",
            Term::Forward => "48hs",
        }
    }

    /// Parse from the wire spelling
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CI" => Some(Term::Spot),
            "48hs" => Some(Term::Forward),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }

    #[inline(always)]
    pub const fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the full instrument id for a ticker under a settlement term
pub fn format_instrument(ticker: &str, term: Term) -> String {
    format!("{ID_PREFIX}{ID_SEPARATOR}{ticker}{ID_SEPARATOR}{}", term.as_str())
}

/// Extract (ticker, term) from a full instrument id
///
/// Only the last two dash-delimited tokens are inspected, so segment
/// variations in the prefix do not matter.
pub fn parse_instrument(id: &str) -> Option<(&str, Term)> {
    let mut it = id.rsplit(ID_SEPARATOR);
    let term = Term::parse(it.next()?)?;
    let ticker = it.next()?;
    if ticker.is_empty() {
        return None;
    }
    Some((ticker, term))
}
