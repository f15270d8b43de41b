//! Public shop settings.

use axum::{Json, extract::State};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use cornershop_core::ShopRates;

use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq)]
pub struct ShippingSettings {
    pub flat_rate: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TaxSettings {
    pub rate: f64,
}

/// Rates clients use to preview totals before checkout.
///
/// Amounts are plain JSON numbers; the server recomputes every total from the
/// exact decimal rates when an order is placed.
#[derive(Debug, Serialize, PartialEq)]
pub struct ShopSettings {
    pub shipping: ShippingSettings,
    pub tax: TaxSettings,
}

impl From<&ShopRates> for ShopSettings {
    fn from(rates: &ShopRates) -> Self {
        Self {
            shipping: ShippingSettings {
                flat_rate: rates.shipping_flat_rate.to_f64().unwrap_or_default(),
            },
            tax: TaxSettings {
                rate: rates.tax_rate.to_f64().unwrap_or_default(),
            },
        }
    }
}

pub async fn show(State(state): State<AppState>) -> Json<ShopSettings> {
    Json(ShopSettings::from(state.rates()))
}
