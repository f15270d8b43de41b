//! Category repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use cornershop_core::CategoryId;

use super::RepositoryError;
use crate::models::{Category, CategoryInput};

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name, id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    /// Returns `true` if the category exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let row: CategoryRow = sqlx::query_as(&format!(
            r"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(input.description.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            r"
            UPDATE categories
            SET name = $2, description = $3, updated_at = now()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.description.as_deref())
        .fetch_optional(self.pool)
        .await?;

        row.map(Category::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Its products keep existing without a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
