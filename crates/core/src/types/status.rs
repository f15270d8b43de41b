//! Order status and user role enums.
//!
//! Status changes are not validated against a transition table: any of the
//! four statuses may follow any other. What a change *does* to inventory is
//! derived from the pair of statuses, see [`OrderStatus::stock_effect`].

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
}

/// Inventory side-effect implied by moving an order between two statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// Stock is untouched.
    None,
    /// The order's line quantities go back on the shelf.
    Restore,
    /// The order's line quantities are checked and taken off the shelf again.
    Reserve,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Returns `true` for [`OrderStatus::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Stock effect of changing an order from `self` to `next`.
    ///
    /// Leaving `cancelled` reserves stock again; entering `cancelled` from any
    /// active status restores it. Every other change (including a no-op
    /// change to the same status) leaves stock alone.
    #[must_use]
    pub const fn stock_effect(self, next: Self) -> StockEffect {
        match (self.is_cancelled(), next.is_cancelled()) {
            (false, true) => StockEffect::Restore,
            (true, false) => StockEffect::Reserve,
            _ => StockEffect::None,
        }
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Role of a storefront account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular shopper.
    #[default]
    Customer,
    /// Can manage the catalog and every customer's orders.
    Admin,
}

impl UserRole {
    /// Map the `is_admin` database flag to a role.
    #[must_use]
    pub const fn from_is_admin(is_admin: bool) -> Self {
        if is_admin { Self::Admin } else { Self::Customer }
    }

    /// Returns `true` for [`UserRole::Admin`].
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}
