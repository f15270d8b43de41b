//! Product repository.
//!
//! Order-driven stock changes go through [`super::inventory`]. The admin edit
//! here writes stock only when it sets an explicit level, and otherwise keeps
//! the column as the row stands when the `UPDATE` locks it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use cornershop_core::pagination::{Page, PageParams};
use cornershop_core::{CategoryId, ProductId};

use super::RepositoryError;
use crate::models::{Product, ProductUpdate, ValidProduct};

/// Columns selected for a [`Product`], with `p` aliasing `products` and `c`
/// aliasing the joined `categories`.
const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.description, p.price, p.stock_quantity, p.category_id,
           c.name AS category_name, p.image_url, p.created_at, p.updated_at
";

/// `stock_quantity` falls back to the column itself, which the `UPDATE`
/// evaluates against the latest committed row.
const UPDATE_PRODUCT: &str = r"
    UPDATE products
    SET name = $2, description = $3, price = $4,
        stock_quantity = COALESCE($5, stock_quantity),
        category_id = $6, image_url = $7, updated_at = now()
    WHERE id = $1
";

const DELETE_BLOCKED_MESSAGE: &str =
    "Cannot delete product. It is associated with one or more orders.";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock_quantity: i32,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            stock_quantity: row.stock_quantity,
            category_id: row.category_id,
            category_name: row.category_name,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Product listing filters.
///
/// `search` matches name or description; `name` matches the name only (admin
/// listing). Blank strings are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    /// Drop blank text filters so equivalent queries share a cache key.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |s: Option<String>| {
            s.map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
        };
        Self {
            search: clean(self.search),
            name: clean(self.name),
            ..self
        }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            qb.push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(name) = &self.name {
            qb.push(" AND p.name ILIKE ").push_bind(like_pattern(name));
        }
        if let Some(category_id) = self.category_id {
            qb.push(" AND p.category_id = ").push_bind(category_id);
        }
        if let Some(min_price) = self.min_price {
            qb.push(" AND p.price >= ").push_bind(min_price);
        }
        if let Some(max_price) = self.max_price {
            qb.push(" AND p.price <= ").push_bind(max_price);
        }
    }
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        params: PageParams,
    ) -> Result<Page<Product>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        select.push(" FROM products p LEFT JOIN categories c ON c.id = p.category_id");
        filter.push_where(&mut select);
        select
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(Product::from).collect(),
            params,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "{PRODUCT_SELECT} FROM products p LEFT JOIN categories c ON c.id = p.category_id WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category does not exist.
    pub async fn create(&self, product: &ValidProduct) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            WITH p AS (
                INSERT INTO products (name, description, price, stock_quantity, category_id, image_url)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            {PRODUCT_SELECT} FROM p LEFT JOIN categories c ON c.id = p.category_id
            "
        ))
        .bind(&product.name)
        .bind(product.description.as_deref())
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(product.category_id)
        .bind(product.image_url.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category does not exist"))?;

        Ok(row.into())
    }

    /// Replace a product's fields. Stock changes only if `update` sets it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let product = &update.product;
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            WITH p AS (
                {UPDATE_PRODUCT}
                RETURNING *
            )
            {PRODUCT_SELECT} FROM p LEFT JOIN categories c ON c.id = p.category_id
            "
        ))
        .bind(id)
        .bind(&product.name)
        .bind(product.description.as_deref())
        .bind(product.price)
        .bind(update.stock_quantity)
        .bind(product.category_id)
        .bind(product.image_url.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category does not exist"))?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a product that no order references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if any order line references it.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let ordered: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_product WHERE product_id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        if ordered {
            return Err(RepositoryError::Conflict(DELETE_BLOCKED_MESSAGE.to_owned()));
        }

        // An order placed between the check and the delete trips the FK instead.
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, DELETE_BLOCKED_MESSAGE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("hoodie"), "%hoodie%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_normalized_drops_blank_text() {
        let filter = ProductFilter {
            search: Some("   ".to_string()),
            name: Some(" Navy ".to_string()),
            category_id: Some(CategoryId::new(3)),
            ..ProductFilter::default()
        }
        .normalized();

        assert_eq!(filter.search, None);
        assert_eq!(filter.name.as_deref(), Some("Navy"));
        assert_eq!(filter.category_id, Some(CategoryId::new(3)));
    }

    #[test]
    fn test_update_keeps_stored_stock_when_unset() {
        assert!(UPDATE_PRODUCT.contains("stock_quantity = COALESCE($5, stock_quantity)"));
    }

    #[test]
    fn test_filter_sql() {
        let filter = ProductFilter {
            search: Some("cap".to_string()),
            min_price: Some(Decimal::ONE),
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        filter.push_where(&mut qb);

        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM products p WHERE TRUE AND (p.name ILIKE $1 OR p.description ILIKE $2) AND p.price >= $3"
        );
    }
}
