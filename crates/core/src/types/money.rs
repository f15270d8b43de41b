//! Money helpers and the shop-wide tax/shipping rates.
//!
//! Amounts are plain [`Decimal`]s in the shop currency's standard unit
//! (dollars, not cents). Persisted amounts have two decimal places.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places stored for every persisted amount.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to [`MONEY_SCALE`] places, halves away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Tax rate and flat shipping fee applied to every order.
///
/// Passed explicitly into the order aggregate computation; serialized as the
/// public `/api/settings` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopRates {
    /// Fraction of the subtotal charged as tax (`0.10` is 10%).
    pub tax_rate: Decimal,
    /// Shipping fee charged once per order regardless of size.
    pub shipping_flat_rate: Decimal,
}

impl ShopRates {
    /// Default tax rate (10%).
    pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
    /// Default flat shipping fee (5.00).
    pub const DEFAULT_SHIPPING_FLAT_RATE: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

    /// Create a new set of rates.
    #[must_use]
    pub const fn new(tax_rate: Decimal, shipping_flat_rate: Decimal) -> Self {
        Self {
            tax_rate,
            shipping_flat_rate,
        }
    }
}

impl Default for ShopRates {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TAX_RATE, Self::DEFAULT_SHIPPING_FLAT_RATE)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap_or_default()
    }

    #[test]
    fn test_defaults() {
        let rates = ShopRates::default();
        assert_eq!(rates.tax_rate, dec("0.10"));
        assert_eq!(rates.shipping_flat_rate, dec("5.00"));
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec("1.005")), dec("1.01"));
        assert_eq!(round_money(dec("1.004")), dec("1.00"));
        assert_eq!(round_money(dec("-1.005")), dec("-1.01"));
        assert_eq!(round_money(dec("12")), dec("12"));
    }
}
