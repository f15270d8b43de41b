//! Customer order routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cornershop_core::order::OrderRequest;
use cornershop_core::pagination::{Page, PageParams};
use cornershop_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result, ValidationErrors};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order, OrderWithLines};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrderPlacedResponse {
    pub message: &'static str,
    pub order: OrderWithLines,
}

#[derive(Debug, Serialize)]
pub struct OrderCancelledResponse {
    pub message: &'static str,
    pub order: Order,
}

/// `PATCH /api/orders/{id}` body.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub status: Option<String>,
}

impl UpdateOrderRequest {
    /// Customers can only move their own orders to `cancelled`.
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        match self.status.as_deref().map(str::parse::<OrderStatus>) {
            None => Err(ValidationErrors::single(
                "status",
                "The status field is required.",
            )),
            Some(Ok(OrderStatus::Cancelled)) => Ok(()),
            Some(Ok(_)) => Err(ValidationErrors::single(
                "status",
                "Orders can only be cancelled.",
            )),
            Some(Err(_)) => Err(ValidationErrors::single(
                "status",
                "The selected status is invalid.",
            )),
        }
    }
}

/// The customer's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<OrderWithLines>>> {
    let page = OrderRepository::new(state.pool())
        .list_for_user(user.id, params)
        .await?;
    Ok(Json(page))
}

/// Place an order from `{"products": [{"id", "quantity"}]}`.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn store(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<OrderRequest>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>)> {
    let order = state.orders().place_order(&user, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            message: "Order placed successfully",
            order,
        }),
    ))
}

/// One of the customer's orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderWithLines>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?
        .order;

    if order.order.user_id != user.id {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }
    Ok(Json(order))
}

/// Cancel through `PATCH` with `{"status": "cancelled"}`.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<UpdateOrderRequest>,
) -> Result<Json<OrderCancelledResponse>> {
    body.validate().map_err(AppError::Validation)?;
    cancel(&state, &user, id).await
}

/// Cancel a pending order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderCancelledResponse>> {
    cancel(&state, &user, id).await
}

async fn cancel(
    state: &AppState,
    user: &CurrentUser,
    id: OrderId,
) -> Result<Json<OrderCancelledResponse>> {
    let order = state.orders().cancel_order(user, id).await?;
    Ok(Json(OrderCancelledResponse {
        message: "Order cancelled successfully",
        order,
    }))
}
