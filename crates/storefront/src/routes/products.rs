//! Public product catalog.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use cornershop_core::pagination::PageParams;
use cornershop_core::{CategoryId, ProductId};

use super::blank_as_none;
use crate::db::ProductRepository;
use crate::db::products::ProductFilter;
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery};
use crate::models::Product;
use crate::state::AppState;

/// Product listing query string, shared with the admin listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<Decimal>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<Decimal>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<u32>,
}

impl ProductQuery {
    /// Split into a normalized filter and page parameters.
    #[must_use]
    pub fn into_parts(self) -> (ProductFilter, PageParams) {
        let filter = ProductFilter {
            search: self.search,
            name: self.name,
            category_id: self.category_id,
            min_price: self.min_price,
            max_price: self.max_price,
        }
        .normalized();
        let params = PageParams {
            page: self.page,
            per_page: self.per_page,
        };
        (filter, params)
    }
}

/// List products, serving repeated queries from the listing cache.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Response> {
    let (filter, params) = query.into_parts();

    if let Some(page) = state.catalog().get(&filter, params).await {
        tracing::debug!("Product listing served from cache");
        return Ok(Json(&*page).into_response());
    }

    let ticket = state.catalog().ticket();
    let page = Arc::new(
        ProductRepository::new(state.pool())
            .list(&filter, params)
            .await?,
    );
    state
        .catalog()
        .insert(filter, params, Arc::clone(&page), ticket)
        .await;

    Ok(Json(&*page).into_response())
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    Ok(Json(product))
}
