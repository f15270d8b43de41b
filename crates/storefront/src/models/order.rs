//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use cornershop_core::order::{OrderTotals, PricedLine};
use cornershop_core::{OrderId, OrderStatus, ProductId, UserId};

/// An order header with its persisted totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The persisted monetary aggregate.
    #[must_use]
    pub const fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: self.subtotal,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
        }
    }
}

/// Fields needed to insert a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub totals: OrderTotals,
    pub status: OrderStatus,
}

/// One line of an order, with the product name for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    /// Unit price captured when the order was placed.
    pub unit_price: Decimal,
}

impl OrderLine {
    #[must_use]
    pub const fn priced(&self) -> PricedLine {
        PricedLine {
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.priced().line_total()
    }
}

/// An order with its line items, as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
}

/// The account an order belongs to, as shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderCustomer {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// An order with its lines and customer, as returned by the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: OrderWithLines,
    pub customer: OrderCustomer,
}
