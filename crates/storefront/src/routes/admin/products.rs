//! Admin product management.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use cornershop_core::pagination::Page;
use cornershop_core::{CategoryId, ProductId};

use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::error::{AppError, Result, ValidationErrors};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductInput, ProductPatch, ValidProduct};
use crate::routes::products::ProductQuery;
use crate::state::AppState;

/// Product listing, straight from the database.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let (filter, params) = query.into_parts();
    let page = ProductRepository::new(state.pool())
        .list(&filter, params)
        .await?;
    Ok(Json(page))
}

/// Create a product.
#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn store(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = validate(&state, input).await?;
    let product = ProductRepository::new(state.pool()).create(&product).await?;

    state.catalog().invalidate_all();
    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Show one product.
#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(find(&state, id).await?))
}

/// Update a product. Absent fields keep their current value.
///
/// Stock is written only when the payload names it, so a concurrent order's
/// decrement survives an edit to other fields.
#[instrument(skip(admin, state, patch), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> Result<Json<Product>> {
    let current = find(&state, id).await?;
    let update = patch.into_update(&current).map_err(AppError::Validation)?;
    check_category(&state, update.product.category_id).await?;
    let product = ProductRepository::new(state.pool())
        .update(id, &update)
        .await?;

    state.catalog().invalidate_all();
    tracing::info!(product_id = %id, "Product updated");
    Ok(Json(product))
}

/// Delete a product that has never been ordered.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
            RepositoryError::Conflict(message) => AppError::Unprocessable(message),
            other => AppError::Database(other),
        })?;

    state.catalog().invalidate_all();
    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find(state: &AppState, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Field validation plus the category lookup.
async fn validate(state: &AppState, input: ProductInput) -> Result<ValidProduct> {
    let product = input.validate().map_err(AppError::Validation)?;
    check_category(state, product.category_id).await?;
    Ok(product)
}

async fn check_category(state: &AppState, category_id: Option<CategoryId>) -> Result<()> {
    if let Some(category_id) = category_id
        && !CategoryRepository::new(state.pool())
            .exists(category_id)
            .await?
    {
        return Err(AppError::Validation(ValidationErrors::single(
            "category_id",
            "The selected category id is invalid.",
        )));
    }
    Ok(())
}
