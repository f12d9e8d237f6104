//! Fixed-point currency arithmetic helpers.
//!
//! All monetary amounts in this crate are `rust_decimal::Decimal` and are
//! rounded half-up to two places at each calculation step, matching currency
//! display and keeping results stable across implementations.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Decimal places for currency amounts.
pub const CURRENCY_DP: u32 = 2;

pub const PERCENT_DIVISOR: Decimal = dec!(100);
pub const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Round a monetary amount half-up (midpoint away from zero) to 2 places.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a percentage figure (e.g. 1.5 meaning 1.5%) to a fraction.
pub fn pct(rate: Decimal) -> Decimal {
    rate / PERCENT_DIVISOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_currency_half_up() {
        assert_eq!(round_currency(dec!(2.345)), dec!(2.35));
        assert_eq!(round_currency(dec!(2.344)), dec!(2.34));
        assert_eq!(round_currency(dec!(2.335)), dec!(2.34));
    }

    #[test]
    fn test_round_currency_exact_values_unchanged() {
        assert_eq!(round_currency(dec!(100.00)), dec!(100.00));
        assert_eq!(round_currency(dec!(0)), dec!(0));
    }

    #[test]
    fn test_round_currency_negative_half_away_from_zero() {
        assert_eq!(round_currency(dec!(-2.345)), dec!(-2.35));
        assert_eq!(round_currency(dec!(-2.344)), dec!(-2.34));
    }

    #[test]
    fn test_pct() {
        assert_eq!(pct(dec!(1.5)), dec!(0.015));
        assert_eq!(pct(dec!(100)), dec!(1));
    }
}
