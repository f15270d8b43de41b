//! Admin order management.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use cornershop_core::pagination::{Page, PageParams};
use cornershop_core::{OrderId, OrderStatus, UserId};

use crate::db::OrderRepository;
use crate::db::orders::OrderFilter;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::models::{AdminOrder, Order};
use crate::routes::blank_as_none;
use crate::state::AppState;

/// Admin order listing query string.
#[derive(Debug, Default, Deserialize)]
pub struct AdminOrderQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<u32>,
}

impl AdminOrderQuery {
    #[must_use]
    pub const fn into_parts(self) -> (OrderFilter, PageParams) {
        (
            OrderFilter {
                status: self.status,
                user_id: self.user_id,
            },
            PageParams {
                page: self.page,
                per_page: self.per_page,
            },
        )
    }
}

/// `PATCH /api/admin/orders/{id}/status` body.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Every customer's orders, newest first.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AdminOrderQuery>,
) -> Result<Json<Page<AdminOrder>>> {
    let (filter, params) = query.into_parts();
    let page = OrderRepository::new(state.pool())
        .list(filter, params)
        .await?;
    Ok(Json(page))
}

#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<AdminOrder>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Move an order to any status, adjusting stock to match.
#[instrument(skip(admin, state, body), fields(admin_id = %admin.id, status = %body.status))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    let order = state.orders().change_status(id, body.status).await?;
    Ok(Json(order))
}
