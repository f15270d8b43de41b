//! Public category listing.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::CategoryRepository;
use crate::error::Result;
use crate::models::Category;
use crate::state::AppState;

/// List every category.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(categories))
}
