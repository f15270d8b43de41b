//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (database)
//!
//! # Public
//! POST /api/register                  - Create account, log in
//! POST /api/login                     - Log in
//! GET  /api/products                  - Product listing (cached)
//! GET  /api/products/{id}             - Product detail
//! GET  /api/categories                - Category listing
//! GET  /api/settings                  - Tax and shipping rates
//!
//! # Customer (requires auth)
//! POST   /api/logout
//! GET    /api/me
//! GET    /api/orders                  - Own orders, newest first
//! POST   /api/orders                  - Place an order
//! GET    /api/orders/{id}
//! PATCH  /api/orders/{id}             - {"status": "cancelled"} only
//! DELETE /api/orders/{id}             - Cancel a pending order
//!
//! # Admin (requires admin)
//! GET|POST         /api/admin/products
//! GET|PUT|DELETE   /api/admin/products/{id}
//! GET|POST         /api/admin/categories
//! GET|PUT|DELETE   /api/admin/categories/{id}
//! GET              /api/admin/orders
//! GET              /api/admin/orders/{id}
//! PATCH            /api/admin/orders/{id}/status
//! ```

pub mod admin;
pub mod auth;
pub mod categories;
pub mod orders;
pub mod products;
pub mod settings;

use std::fmt::Display;
use std::str::FromStr;

use axum::{
    Router,
    routing::{get, post},
};
use serde::{Deserialize, Deserializer, de};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router (rate limited).
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter())
}

/// Create the customer order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::store))
        .route(
            "/{id}",
            get(orders::show)
                .patch(orders::update)
                .delete(orders::destroy),
        )
}

/// Create all API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/categories", get(categories::index))
        .route("/settings", get(settings::show))
        .nest("/orders", order_routes())
        .nest("/admin", admin::routes())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/api", api_routes())
}

/// Deserialize an optional query value, treating a blank value as absent.
///
/// `?category_id=` from a cleared filter input is the same as no filter.
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Query {
        #[serde(default, deserialize_with = "blank_as_none")]
        page: Option<u32>,
    }

    fn parse(uri: &'static str) -> Option<Query> {
        axum::extract::Query::<Query>::try_from_uri(&uri.parse().unwrap())
            .ok()
            .map(|q| q.0)
    }

    #[test]
    fn test_blank_as_none() {
        assert_eq!(parse("/?page=").unwrap().page, None);
        assert_eq!(parse("/").unwrap().page, None);
        assert_eq!(parse("/?page=3").unwrap().page, Some(3));
        assert!(parse("/?page=abc").is_none());
    }
}
