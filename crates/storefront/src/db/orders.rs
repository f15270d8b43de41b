//! Order repository (read side).
//!
//! Orders are created and their status changed only inside inventory
//! transactions, see [`super::inventory`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use cornershop_core::pagination::{Page, PageParams};
use cornershop_core::{OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{AdminOrder, Order, OrderCustomer, OrderLine, OrderWithLines};

/// Columns selected for an [`Order`] from `orders o`.
pub(super) const ORDER_COLUMNS: &str =
    "o.id, o.user_id, o.subtotal, o.tax, o.shipping, o.total, o.status, o.created_at, o.updated_at";

#[derive(sqlx::FromRow)]
pub(super) struct OrderRow {
    id: OrderId,
    user_id: UserId,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            subtotal: row.subtotal,
            tax: row.tax,
            shipping: row.shipping,
            total: row.total,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AdminOrderRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: String,
    customer_email: String,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: OrderId,
    product_id: ProductId,
    name: String,
    quantity: i32,
    price: Decimal,
}

/// Admin order listing filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
}

impl OrderFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(status) = self.status {
            qb.push(" AND o.status = ").push_bind(status);
        }
        if let Some(user_id) = self.user_id {
            qb.push(" AND o.user_id = ").push_bind(user_id);
        }
    }
}

/// Repository for reading orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of a customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        params: PageParams,
    ) -> Result<Page<OrderWithLines>, RepositoryError> {
        let filter = OrderFilter {
            user_id: Some(user_id),
            ..OrderFilter::default()
        };
        let page = self.list(filter, params).await?;
        Ok(page.map(|admin_order| admin_order.order))
    }

    /// One page of orders matching `filter`, newest first, with customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: OrderFilter,
        params: PageParams,
    ) -> Result<Page<AdminOrder>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS}, u.name AS customer_name, u.email AS customer_email \
             FROM orders o JOIN users u ON u.id = o.user_id"
        ));
        filter.push_where(&mut select);
        select
            .push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows: Vec<AdminOrderRow> = select.build_query_as().fetch_all(self.pool).await?;
        let orders = self.attach_lines(rows).await?;

        Ok(Page::new(
            orders,
            params,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Get an order with its lines and customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<AdminOrder>, RepositoryError> {
        let row: Option<AdminOrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS}, u.name AS customer_name, u.email AS customer_email \
             FROM orders o JOIN users u ON u.id = o.user_id WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.attach_lines(vec![row]).await?.into_iter().next())
    }

    /// Line items for `order_id`, ordered by product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let mut by_order = self.lines_for(&[order_id]).await?;
        Ok(by_order.remove(&order_id).unwrap_or_default())
    }

    async fn lines_for(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
        let ids: Vec<i64> = order_ids.iter().map(OrderId::as_i64).collect();
        let rows: Vec<OrderLineRow> = sqlx::query_as(
            r"
            SELECT op.order_id, op.product_id, p.name, op.quantity, op.price
            FROM order_product op
            JOIN products p ON p.id = op.product_id
            WHERE op.order_id = ANY($1)
            ORDER BY op.order_id, op.product_id
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            by_order.entry(row.order_id).or_default().push(OrderLine {
                product_id: row.product_id,
                name: row.name,
                quantity: row.quantity,
                unit_price: row.price,
            });
        }
        Ok(by_order)
    }

    async fn attach_lines(
        &self,
        rows: Vec<AdminOrderRow>,
    ) -> Result<Vec<AdminOrder>, RepositoryError> {
        let ids: Vec<OrderId> = rows.iter().map(|r| r.order.id).collect();
        let mut lines = self.lines_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let order = Order::from(row.order);
                AdminOrder {
                    customer: OrderCustomer {
                        id: order.user_id,
                        name: row.customer_name,
                        email: row.customer_email,
                    },
                    order: OrderWithLines {
                        items: lines.remove(&order.id).unwrap_or_default(),
                        order,
                    },
                }
            })
            .collect())
    }
}
