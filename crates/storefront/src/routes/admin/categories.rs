//! Admin category management.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use cornershop_core::CategoryId;

use crate::db::{CategoryRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAdmin;
use crate::models::{Category, CategoryInput};
use crate::state::AppState;

fn not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Category not found".to_string()),
        other => AppError::Database(other),
    }
}

#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn store(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let input = input.validate().map_err(AppError::Validation)?;
    let category = CategoryRepository::new(state.pool()).create(&input).await?;

    tracing::info!(category_id = %category.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}

/// Rename a category. Listings show the category name, so the cache goes.
#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<Json<Category>> {
    let input = input.validate().map_err(AppError::Validation)?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(not_found)?;

    state.catalog().invalidate_all();
    Ok(Json(category))
}

/// Delete a category. Its products become uncategorized.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found)?;

    state.catalog().invalidate_all();
    tracing::info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
