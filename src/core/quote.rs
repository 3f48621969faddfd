//! Quote rows and normalized tick updates
//!
//! Fixed-shape row type for the quote table. Absent prices and sizes are
//! an explicit zero sentinel so arithmetic over rows stays total.

use super::costs::CostModel;
use super::instrument::{Side, Term};
use rust_decimal::Decimal;

/// Cost-adjusted price cache for one row
///
/// Once a row's dispatch price is computed it stays fixed for the lifetime
/// of the row, even if the raw quote moves before the pair finishes firing.
/// A row replacement (decision price changed) resets the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachedPrice {
    /// Not computed yet
    #[default]
    Pending,
    /// Computed and frozen
    Computed(Decimal),
}

impl CachedPrice {
    #[inline(always)]
    pub const fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    /// Cached value, if any
    pub fn value(&self) -> Option<Decimal> {
        match self {
            CachedPrice::Pending => None,
            CachedPrice::Computed(v) => Some(*v),
        }
    }
}

/// Normalized tick: one (symbol, term) observation off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteUpdate {
    pub symbol: String,
    pub term: Term,
    /// Best bid, zero when absent
    pub bid: Decimal,
    /// Best offer, zero when absent
    pub offer: Decimal,
    /// Size at the decision price, zero when no liquidity
    pub size: u64,
}

impl QuoteUpdate {
    /// The price field used to decide whether this update is economically
    /// significant: offer for the spot term, bid for the forward term.
    #[inline]
    pub fn decision_price(&self) -> Decimal {
        match self.term {
            Term::Spot => self.offer,
            Term::Forward => self.bid,
        }
    }
}

/// One row of the quote table: the latest observation for a (symbol, term)
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    pub symbol: String,
    pub term: Term,
    pub bid: Decimal,
    pub offer: Decimal,
    pub size: u64,
    /// Cost-adjusted dispatch price, computed once per row
    pub cost_adjusted: CachedPrice,
    /// Last annualized rate computed for this symbol's pair
    pub tna: Option<Decimal>,
}

impl QuoteRow {
    /// Build a fresh row from a normalized update; caches start cold
    pub fn from_update(update: &QuoteUpdate) -> Self {
        Self {
            symbol: update.symbol.clone(),
            term: update.term,
            bid: update.bid,
            offer: update.offer,
            size: update.size,
            cost_adjusted: CachedPrice::Pending,
            tna: None,
        }
    }

    /// Decision price of this row (offer for spot, bid for forward)
    #[inline]
    pub fn decision_price(&self) -> Decimal {
        match self.term {
            Term::Spot => self.offer,
            Term::Forward => self.bid,
        }
    }

    /// Leg side this row takes in the spread: buy spot, sell forward
    #[inline]
    pub fn leg_side(&self) -> Side {
        match self.term {
            Term::Spot => Side::Buy,
            Term::Forward => Side::Sell,
        }
    }

    /// Cost-adjusted price, computing and freezing it on first use.
    ///
    /// A second call returns the frozen value without re-deriving it, even
    /// if the raw price fields changed in between.
    pub fn adjusted_price(&mut self, model: &CostModel) -> Decimal {
        match self.cost_adjusted {
            CachedPrice::Computed(v) => v,
            CachedPrice::Pending => {
                let v = model.adjust(self.leg_side(), self.decision_price());
                self.cost_adjusted = CachedPrice::Computed(v);
                v
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn update(term: Term, bid: &str, offer: &str, size: u64) -> QuoteUpdate {
        QuoteUpdate {
            symbol: "ALUA".to_string(),
            term,
            bid: dec(bid),
            offer: dec(offer),
            size,
        }
    }

    #[test]
    fn test_decision_price_by_term() {
        let spot = update(Term::Spot, "0", "84990.0", 46);
        assert_eq!(spot.decision_price(), dec("84990.0"));

        let forward = update(Term::Forward, "84990.0", "0", 46);
        assert_eq!(forward.decision_price(), dec("84990.0"));
    }

    #[test]
    fn test_leg_sides() {
        let spot = QuoteRow::from_update(&update(Term::Spot, "0", "10", 1));
        let fwd = QuoteRow::from_update(&update(Term::Forward, "15", "0", 1));
        assert_eq!(spot.leg_side(), Side::Buy);
        assert_eq!(fwd.leg_side(), Side::Sell);
    }

    #[test]
    fn test_adjusted_price_computes_once() {
        let model = CostModel::new(dec("0.15"), dec("0.08"));
        let mut row = QuoteRow::from_update(&update(Term::Spot, "0", "1260.5", 5));

        assert!(!row.cost_adjusted.is_computed());
        let first = row.adjusted_price(&model);
        assert_eq!(first, dec("1264.01"));
        assert!(row.cost_adjusted.is_computed());

        // The raw quote moves but the frozen dispatch price does not.
        row.offer = dec("9999.0");
        let second = row.adjusted_price(&model);
        assert_eq!(second, first);
    }

    #[test]
    fn test_fresh_row_has_cold_caches() {
        let row = QuoteRow::from_update(&update(Term::Forward, "2027.50", "0", 3));
        assert_eq!(row.cost_adjusted, CachedPrice::Pending);
        assert_eq!(row.tna, None);
        assert_eq!(row.size, 3);
    }
}
