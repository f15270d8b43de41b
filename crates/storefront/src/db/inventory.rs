//! `PostgreSQL` inventory transactions.
//!
//! Rows are locked with `SELECT ... FOR UPDATE` and stay locked until the
//! transaction commits or is dropped (which rolls back).

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use cornershop_core::order::{PricedLine, ReservationLine};
use cornershop_core::{OrderId, OrderStatus, ProductId};

use super::RepositoryError;
use super::orders::{ORDER_COLUMNS, OrderRow};
use crate::models::{NewOrder, Order};
use crate::services::inventory::{InventoryStore, InventoryTx, LockedOrder, LockedProduct};

#[derive(sqlx::FromRow)]
struct LockedProductRow {
    id: ProductId,
    name: String,
    price: Decimal,
    stock_quantity: i32,
}

impl From<LockedProductRow> for LockedProduct {
    fn from(row: LockedProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            stock_quantity: row.stock_quantity,
        }
    }
}

/// Inventory store backed by the storefront pool.
#[derive(Clone)]
pub struct PgInventory {
    pool: PgPool,
}

impl PgInventory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// An open database transaction.
pub struct PgInventoryTx {
    tx: Transaction<'static, Postgres>,
}

impl InventoryStore for PgInventory {
    type Tx = PgInventoryTx;

    async fn begin(&self) -> Result<PgInventoryTx, RepositoryError> {
        Ok(PgInventoryTx {
            tx: self.pool.begin().await?,
        })
    }
}

impl InventoryTx for PgInventoryTx {
    async fn lock_product(
        &mut self,
        id: ProductId,
    ) -> Result<Option<LockedProduct>, RepositoryError> {
        let row: Option<LockedProductRow> = sqlx::query_as(
            "SELECT id, name, price, stock_quantity FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(LockedProduct::from))
    }

    async fn set_stock(
        &mut self,
        id: ProductId,
        stock_quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(stock_quantity)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO orders AS o (user_id, subtotal, tax, shipping, total, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(order.totals.subtotal)
        .bind(order.totals.tax)
        .bind(order.totals.shipping)
        .bind(order.totals.total)
        .bind(order.status)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn attach_lines(
        &mut self,
        order_id: OrderId,
        lines: &[PricedLine],
    ) -> Result<(), RepositoryError> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut insert = QueryBuilder::<Postgres>::new(
            "INSERT INTO order_product (order_id, product_id, quantity, price) ",
        );
        insert.push_values(lines, |mut values, line| {
            values
                .push_bind(order_id)
                .push_bind(line.product_id)
                .push_bind(line.quantity)
                .push_bind(line.unit_price);
        });
        insert.build().execute(&mut *self.tx).await?;

        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<LockedOrder>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<(ProductId, i32)> = sqlx::query_as(
            "SELECT product_id, quantity FROM order_product WHERE order_id = $1 ORDER BY product_id",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(Some(LockedOrder {
            order: row.into(),
            lines: lines
                .into_iter()
                .map(|(product_id, quantity)| ReservationLine {
                    product_id,
                    quantity,
                })
                .collect(),
        }))
    }

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r"
            UPDATE orders o SET status = $2, updated_at = now()
            WHERE o.id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Order::from).ok_or(RepositoryError::NotFound)
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
