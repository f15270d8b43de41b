//! Admin catalog and order management.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin), so a
//! customer session gets a 403 and no session gets a 401.

pub mod categories;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::state::AppState;

/// Create the admin routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index).post(products::store))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .patch(products::update)
                .delete(products::destroy),
        )
        .route("/categories", get(categories::index).post(categories::store))
        .route(
            "/categories/{id}",
            get(categories::show)
                .put(categories::update)
                .delete(categories::destroy),
        )
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", patch(orders::update_status))
}
