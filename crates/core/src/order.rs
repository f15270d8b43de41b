//! Order requests and the order aggregate.
//!
//! An [`OrderRequest`] is what a shopper asks for; [`PricedLine`]s are what the
//! inventory reserved at live prices; [`OrderTotals`] is computed once from the
//! priced lines and persisted with the order. Totals are never recomputed when
//! an order is read back.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ProductId, ShopRates, round_money};

/// Errors found while normalizing an [`OrderRequest`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderRequestError {
    /// The request has no lines.
    #[error("at least one product is required")]
    Empty,
    /// A line asks for less than one unit.
    #[error("quantity for product {product_id} must be at least 1")]
    InvalidQuantity {
        /// Offending product.
        product_id: ProductId,
    },
    /// Merged quantity for one product does not fit the stock column.
    #[error("quantity for product {product_id} is too large")]
    QuantityOverflow {
        /// Offending product.
        product_id: ProductId,
    },
}

/// One requested `(product, quantity)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    /// Product being ordered.
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// Units requested. Signed so that bad input reaches validation.
    pub quantity: i64,
}

/// A shopper's order request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Requested lines, in the order the shopper listed them.
    #[serde(rename = "products")]
    pub lines: Vec<LineRequest>,
}

/// A validated, deduplicated line ready for stock reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationLine {
    /// Product to reserve.
    pub product_id: ProductId,
    /// Units to reserve (at least 1).
    pub quantity: i32,
}

impl OrderRequest {
    /// Build a request from `(product, quantity)` pairs.
    #[must_use]
    pub fn new(lines: impl IntoIterator<Item = (ProductId, i64)>) -> Self {
        Self {
            lines: lines
                .into_iter()
                .map(|(product_id, quantity)| LineRequest {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    /// Validate the request and merge repeated products.
    ///
    /// Lines for the same product are summed into one. The result is sorted by
    /// product id, which is also the order rows are locked in, so two orders
    /// over the same products always lock them in the same sequence.
    ///
    /// # Errors
    ///
    /// Returns [`OrderRequestError`] if the request is empty, a quantity is
    /// below one, or a merged quantity overflows `i32`.
    pub fn normalize(&self) -> Result<Vec<ReservationLine>, OrderRequestError> {
        if self.lines.is_empty() {
            return Err(OrderRequestError::Empty);
        }

        let mut merged: BTreeMap<ProductId, i64> = BTreeMap::new();
        for line in &self.lines {
            if line.quantity < 1 {
                return Err(OrderRequestError::InvalidQuantity {
                    product_id: line.product_id,
                });
            }
            let entry = merged.entry(line.product_id).or_insert(0);
            *entry = entry.saturating_add(line.quantity);
        }

        merged
            .into_iter()
            .map(|(product_id, quantity)| {
                i32::try_from(quantity)
                    .map(|quantity| ReservationLine {
                        product_id,
                        quantity,
                    })
                    .map_err(|_| OrderRequestError::QuantityOverflow { product_id })
            })
            .collect()
    }
}

/// A reserved line with the unit price captured at purchase time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    /// Product that was reserved.
    pub product_id: ProductId,
    /// Units reserved.
    pub quantity: i32,
    /// Product price when the order was placed.
    pub unit_price: Decimal,
}

impl PricedLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Monetary aggregate persisted on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute the order aggregate.
    ///
    /// - subtotal = Σ(unit price × quantity)
    /// - tax = subtotal × tax rate, rounded to cents
    /// - shipping = flat rate
    /// - total = subtotal + tax + shipping
    ///
    /// ```
    /// use std::str::FromStr;
    /// use rust_decimal::Decimal;
    /// use cornershop_core::{ProductId, ShopRates};
    /// use cornershop_core::order::{OrderTotals, PricedLine};
    ///
    /// let line = PricedLine {
    ///     product_id: ProductId::new(1),
    ///     quantity: 2,
    ///     unit_price: Decimal::from_str("50.00").unwrap(),
    /// };
    /// let totals = OrderTotals::compute(&[line], &ShopRates::default());
    /// assert_eq!(totals.total, Decimal::from_str("115.00").unwrap());
    /// ```
    #[must_use]
    pub fn compute(lines: &[PricedLine], rates: &ShopRates) -> Self {
        let subtotal = round_money(lines.iter().map(PricedLine::line_total).sum());
        let tax = round_money(subtotal * rates.tax_rate);
        let shipping = round_money(rates.shipping_flat_rate);

        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap_or_default()
    }

    fn line(id: i64, quantity: i32, price: &str) -> PricedLine {
        PricedLine {
            product_id: ProductId::new(id),
            quantity,
            unit_price: dec(price),
        }
    }

    #[test]
    fn test_reference_example() {
        let totals = OrderTotals::compute(&[line(1, 2, "50.00")], &ShopRates::default());

        assert_eq!(totals.subtotal, dec("100.00"));
        assert_eq!(totals.tax, dec("10.00"));
        assert_eq!(totals.shipping, dec("5.00"));
        assert_eq!(totals.total, dec("115.00"));
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        let rates = ShopRates::new(dec("0.0825"), dec("7.49"));
        let totals = OrderTotals::compute(
            &[line(1, 3, "19.99"), line(2, 1, "0.35"), line(3, 7, "4.10")],
            &rates,
        );

        assert_eq!(totals.subtotal, dec("89.02"));
        assert_eq!(totals.tax, dec("7.34"));
        assert_eq!(totals.total, totals.subtotal + totals.tax + totals.shipping);
    }

    #[test]
    fn test_zero_rates() {
        let rates = ShopRates::new(Decimal::ZERO, Decimal::ZERO);
        let totals = OrderTotals::compute(&[line(1, 1, "12.50")], &rates);
        assert_eq!(totals.total, dec("12.50"));
    }

    #[test]
    fn test_normalize_merges_and_sorts() {
        let request = OrderRequest::new([
            (ProductId::new(9), 1),
            (ProductId::new(3), 2),
            (ProductId::new(9), 4),
        ]);

        let lines = request.normalize();
        assert_eq!(
            lines,
            Ok(vec![
                ReservationLine {
                    product_id: ProductId::new(3),
                    quantity: 2
                },
                ReservationLine {
                    product_id: ProductId::new(9),
                    quantity: 5
                },
            ])
        );
    }

    #[test]
    fn test_normalize_rejects_empty_and_non_positive() {
        assert_eq!(
            OrderRequest::default().normalize(),
            Err(OrderRequestError::Empty)
        );
        assert_eq!(
            OrderRequest::new([(ProductId::new(1), 0)]).normalize(),
            Err(OrderRequestError::InvalidQuantity {
                product_id: ProductId::new(1)
            })
        );
    }

    #[test]
    fn test_normalize_rejects_overflow() {
        let request = OrderRequest::new([
            (ProductId::new(1), i64::from(i32::MAX)),
            (ProductId::new(1), 1),
        ]);
        assert_eq!(
            request.normalize(),
            Err(OrderRequestError::QuantityOverflow {
                product_id: ProductId::new(1)
            })
        );
    }

    #[test]
    fn test_request_wire_shape() {
        let parsed: Result<OrderRequest, _> =
            serde_json::from_str(r#"{"products":[{"id":4,"quantity":2}]}"#);
        assert_eq!(parsed.ok(), Some(OrderRequest::new([(ProductId::new(4), 2)])));
    }
}
