//! Cost adjustment for dispatch prices
//!
//! Commission and market-right fees are configured as percentages of
//! notional; VAT applies to the fee amount, not the notional. A buy pays
//! the fees on top of the price, a sell gives them up.

use super::instrument::Side;
use rust_decimal::Decimal;

/// VAT rate applied to the commission + market-right amount, in percent
const VAT_PCT: Decimal = Decimal::from_parts(21, 0, 0, false, 0);

/// Decimal places kept on adjusted prices
const PRICE_DP: u32 = 2;

/// Direction-aware fee model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    /// Commission + market right, in percent of notional
    cost_rate_pct: Decimal,
}

impl CostModel {
    /// Build from the two configured fee rates (percent of notional)
    pub fn new(commission_pct: Decimal, market_right_pct: Decimal) -> Self {
        Self {
            cost_rate_pct: commission_pct + market_right_pct,
        }
    }

    /// Combined fee rate in percent
    #[inline(always)]
    pub fn cost_rate_pct(&self) -> Decimal {
        self.cost_rate_pct
    }

    /// Adjust a raw price for fees and VAT in the leg's direction,
    /// rounded to 2 decimals
    pub fn adjust(&self, side: Side, price: Decimal) -> Decimal {
        let fees = price * self.cost_rate_pct / Decimal::ONE_HUNDRED;
        let vat = fees * VAT_PCT / Decimal::ONE_HUNDRED;
        let adjusted = match side {
            Side::Sell => price - fees - vat,
            Side::Buy => price + fees + vat,
        };
        adjusted.round_dp(PRICE_DP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    /// Commission 0.15%, market right 0.08% - the configuration the golden
    /// values below were produced under
    fn model() -> CostModel {
        CostModel::new(dec("0.15"), dec("0.08"))
    }

    #[test]
    fn test_buy_adds_fees_and_vat() {
        assert_eq!(model().adjust(Side::Buy, dec("73220.00")), dec("73423.77"));
        assert_eq!(model().adjust(Side::Buy, dec("1260.5")), dec("1264.01"));
    }

    #[test]
    fn test_sell_subtracts_fees_and_vat() {
        assert_eq!(model().adjust(Side::Sell, dec("1260.5")), dec("1256.99"));
    }

    #[test]
    fn test_zero_price_stays_zero() {
        assert_eq!(model().adjust(Side::Buy, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(model().adjust(Side::Sell, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_combined_rate() {
        assert_eq!(model().cost_rate_pct(), dec("0.23"));
    }

    #[test]
    fn test_buy_sell_bracket_raw_price() {
        let price = dec("5000.00");
        let m = model();
        assert!(m.adjust(Side::Sell, price) < price);
        assert!(m.adjust(Side::Buy, price) > price);
    }
}
