//! Inventory reconciliation.
//!
//! Every stock mutation happens inside one transaction opened by the caller:
//! lock the product row, check, write. Any error drops the transaction, which
//! rolls back every decrement or restore made so far.
//!
//! Lines are always visited in ascending product id order so that two
//! transactions touching the same products take their row locks in the same
//! order and cannot deadlock.

use std::future::Future;

use rust_decimal::Decimal;
use thiserror::Error;

use cornershop_core::order::{PricedLine, ReservationLine};
use cornershop_core::{OrderId, OrderStatus, ProductId};

use crate::db::RepositoryError;
use crate::models::{NewOrder, Order, OrderLine};

/// Errors raised while reconciling stock.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A line asks for more units than are on the shelf.
    #[error("Not enough stock available for {name}. Available: {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: i32,
        requested: i32,
    },

    /// A line references a product that does not exist.
    #[error("The selected product {0} is invalid.")]
    ProductNotFound(ProductId),

    /// Restoring a line would push stock past the column's range.
    #[error("Stock for product {product_id} cannot be increased any further.")]
    StockOverflow { product_id: ProductId },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A product row held under a row lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock_quantity: i32,
}

/// An order row held under a row lock, with its line quantities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedOrder {
    pub order: Order,
    pub lines: Vec<ReservationLine>,
}

/// Source of inventory transactions.
pub trait InventoryStore: Send + Sync {
    type Tx: InventoryTx;

    /// Open a transaction. Dropping it without [`InventoryTx::commit`] rolls
    /// it back.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RepositoryError>> + Send;
}

/// Operations available inside an inventory transaction.
pub trait InventoryTx: Send {
    /// Lock a product row and read it. `None` if it does not exist.
    fn lock_product(
        &mut self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<LockedProduct>, RepositoryError>> + Send;

    fn set_stock(
        &mut self,
        id: ProductId,
        stock_quantity: i32,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn insert_order(
        &mut self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// Attach line items with the unit price captured at reservation time.
    fn attach_lines(
        &mut self,
        order_id: OrderId,
        lines: &[PricedLine],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Lock an order row and read it with its lines. `None` if it does not
    /// exist.
    fn lock_order(
        &mut self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<LockedOrder>, RepositoryError>> + Send;

    fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

fn by_product_id(lines: &[ReservationLine]) -> Vec<ReservationLine> {
    let mut sorted = lines.to_vec();
    sorted.sort_by_key(|line| line.product_id);
    sorted
}

async fn lock_existing<T: InventoryTx>(
    tx: &mut T,
    id: ProductId,
) -> Result<LockedProduct, InventoryError> {
    tx.lock_product(id)
        .await?
        .ok_or(InventoryError::ProductNotFound(id))
}

/// Take every line's quantity off the shelf.
///
/// Returns the lines with the product name and the live unit price at the
/// moment of reservation, in product id order.
///
/// # Errors
///
/// Returns `InventoryError::InsufficientStock` for the first line whose product
/// has fewer units than requested, `InventoryError::ProductNotFound` for an
/// unknown product. The transaction must then be dropped.
pub async fn reserve_lines<T: InventoryTx>(
    tx: &mut T,
    lines: &[ReservationLine],
) -> Result<Vec<OrderLine>, InventoryError> {
    let mut reserved = Vec::with_capacity(lines.len());

    for line in by_product_id(lines) {
        let product = lock_existing(tx, line.product_id).await?;

        if product.stock_quantity < line.quantity {
            return Err(InventoryError::InsufficientStock {
                product_id: product.id,
                name: product.name,
                available: product.stock_quantity,
                requested: line.quantity,
            });
        }

        tx.set_stock(product.id, product.stock_quantity - line.quantity)
            .await?;

        reserved.push(OrderLine {
            product_id: product.id,
            name: product.name,
            quantity: line.quantity,
            unit_price: product.price,
        });
    }

    Ok(reserved)
}

/// Put every line's quantity back on the shelf.
///
/// # Errors
///
/// Returns `InventoryError::ProductNotFound` if a product no longer exists and
/// `InventoryError::StockOverflow` if the new level does not fit the column.
pub async fn restore_lines<T: InventoryTx>(
    tx: &mut T,
    lines: &[ReservationLine],
) -> Result<(), InventoryError> {
    for line in by_product_id(lines) {
        let product = lock_existing(tx, line.product_id).await?;
        let restored = product
            .stock_quantity
            .checked_add(line.quantity)
            .ok_or(InventoryError::StockOverflow {
                product_id: product.id,
            })?;
        tx.set_stock(product.id, restored).await?;
    }
    Ok(())
}

/// Take an order's quantities off the shelf again after it leaves
/// `cancelled`.
///
/// # Errors
///
/// Same as [`reserve_lines`].
pub async fn rereserve_lines<T: InventoryTx>(
    tx: &mut T,
    lines: &[ReservationLine],
) -> Result<(), InventoryError> {
    reserve_lines(tx, lines).await.map(|_| ())
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`InventoryStore`] for service tests.
    //!
    //! The whole store is one mutex: a transaction holds it from `begin` until
    //! it is committed or dropped, so transactions are fully serialized. Writes
    //! go to a working copy that only `commit` publishes.

    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::Utc;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    use super::*;

    #[derive(Debug, Clone, Default)]
    struct State {
        products: BTreeMap<ProductId, LockedProduct>,
        orders: BTreeMap<OrderId, (Order, Vec<PricedLine>)>,
        next_order_id: i64,
    }

    #[derive(Clone, Default)]
    pub(crate) struct MemoryInventory {
        state: Arc<Mutex<State>>,
    }

    impl MemoryInventory {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) async fn add_product(&self, id: i64, name: &str, price: &str, stock: i32) {
            let id = ProductId::new(id);
            self.state.lock().await.products.insert(
                id,
                LockedProduct {
                    id,
                    name: name.to_string(),
                    price: price.parse().expect("valid decimal"),
                    stock_quantity: stock,
                },
            );
        }

        pub(crate) async fn stock(&self, id: i64) -> i32 {
            self.state.lock().await.products[&ProductId::new(id)].stock_quantity
        }

        pub(crate) async fn order(&self, id: OrderId) -> Option<Order> {
            self.state
                .lock()
                .await
                .orders
                .get(&id)
                .map(|(order, _)| order.clone())
        }

        pub(crate) async fn order_lines(&self, id: OrderId) -> Vec<PricedLine> {
            self.state
                .lock()
                .await
                .orders
                .get(&id)
                .map(|(_, lines)| lines.clone())
                .unwrap_or_default()
        }

        pub(crate) async fn order_count(&self) -> usize {
            self.state.lock().await.orders.len()
        }

        /// Force an order's status without touching stock.
        pub(crate) async fn force_status(&self, id: OrderId, status: OrderStatus) {
            if let Some((order, _)) = self.state.lock().await.orders.get_mut(&id) {
                order.status = status;
            }
        }
    }

    pub(crate) struct MemoryTx {
        guard: OwnedMutexGuard<State>,
        working: State,
    }

    impl InventoryStore for MemoryInventory {
        type Tx = MemoryTx;

        async fn begin(&self) -> Result<MemoryTx, RepositoryError> {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let working = (*guard).clone();
            Ok(MemoryTx { guard, working })
        }
    }

    impl InventoryTx for MemoryTx {
        async fn lock_product(
            &mut self,
            id: ProductId,
        ) -> Result<Option<LockedProduct>, RepositoryError> {
            Ok(self.working.products.get(&id).cloned())
        }

        async fn set_stock(
            &mut self,
            id: ProductId,
            stock_quantity: i32,
        ) -> Result<(), RepositoryError> {
            let product = self
                .working
                .products
                .get_mut(&id)
                .ok_or(RepositoryError::NotFound)?;
            if stock_quantity < 0 {
                return Err(RepositoryError::Conflict(
                    "stock_quantity must not be negative".to_string(),
                ));
            }
            product.stock_quantity = stock_quantity;
            Ok(())
        }

        async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
            self.working.next_order_id += 1;
            let now = Utc::now();
            let inserted = Order {
                id: OrderId::new(self.working.next_order_id),
                user_id: order.user_id,
                subtotal: order.totals.subtotal,
                tax: order.totals.tax,
                shipping: order.totals.shipping,
                total: order.totals.total,
                status: order.status,
                created_at: now,
                updated_at: now,
            };
            self.working
                .orders
                .insert(inserted.id, (inserted.clone(), Vec::new()));
            Ok(inserted)
        }

        async fn attach_lines(
            &mut self,
            order_id: OrderId,
            lines: &[PricedLine],
        ) -> Result<(), RepositoryError> {
            let (_, attached) = self
                .working
                .orders
                .get_mut(&order_id)
                .ok_or(RepositoryError::NotFound)?;
            attached.extend_from_slice(lines);
            Ok(())
        }

        async fn lock_order(&mut self, id: OrderId) -> Result<Option<LockedOrder>, RepositoryError> {
            Ok(self.working.orders.get(&id).map(|(order, lines)| LockedOrder {
                order: order.clone(),
                lines: lines
                    .iter()
                    .map(|line| ReservationLine {
                        product_id: line.product_id,
                        quantity: line.quantity,
                    })
                    .collect(),
            }))
        }

        async fn set_order_status(
            &mut self,
            id: OrderId,
            status: OrderStatus,
        ) -> Result<Order, RepositoryError> {
            let (order, _) = self
                .working
                .orders
                .get_mut(&id)
                .ok_or(RepositoryError::NotFound)?;
            order.status = status;
            order.updated_at = Utc::now();
            Ok(order.clone())
        }

        async fn commit(mut self) -> Result<(), RepositoryError> {
            *self.guard = self.working;
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::testing::MemoryInventory;
    use super::*;

    fn line(product_id: i64, quantity: i32) -> ReservationLine {
        ReservationLine {
            product_id: ProductId::new(product_id),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_reserve_decrements_and_captures_price() {
        let store = MemoryInventory::new();
        store.add_product(1, "Classic Navy Hoodie", "50.00", 10).await;
        store.add_product(2, "Canvas Tote", "12.50", 3).await;

        let mut tx = store.begin().await.unwrap();
        let reserved = reserve_lines(&mut tx, &[line(2, 3), line(1, 2)])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.stock(1).await, 8);
        assert_eq!(store.stock(2).await, 0);
        let ids: Vec<i64> = reserved.iter().map(|l| l.product_id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(reserved[0].unit_price, "50.00".parse::<Decimal>().unwrap());
        assert_eq!(reserved[1].name, "Canvas Tote");
    }

    #[tokio::test]
    async fn test_short_line_names_product_and_available() {
        let store = MemoryInventory::new();
        store.add_product(1, "Classic Navy Hoodie", "50.00", 10).await;
        store.add_product(2, "Canvas Tote", "12.50", 1).await;

        let mut tx = store.begin().await.unwrap();
        let err = reserve_lines(&mut tx, &[line(1, 4), line(2, 2)])
            .await
            .unwrap_err();
        drop(tx);

        match err {
            InventoryError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => {
                assert_eq!(product_id, ProductId::new(2));
                assert_eq!(name, "Canvas Tote");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Product 1 was decremented in the dropped transaction only.
        assert_eq!(store.stock(1).await, 10);
        assert_eq!(store.stock(2).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let store = MemoryInventory::new();
        let mut tx = store.begin().await.unwrap();
        let err = reserve_lines(&mut tx, &[line(99, 1)]).await.unwrap_err();
        assert!(matches!(err, InventoryError::ProductNotFound(id) if id == ProductId::new(99)));
    }

    #[tokio::test]
    async fn test_restore_adds_back() {
        let store = MemoryInventory::new();
        store.add_product(1, "Classic Navy Hoodie", "50.00", 2).await;

        let mut tx = store.begin().await.unwrap();
        restore_lines(&mut tx, &[line(1, 3)]).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.stock(1).await, 5);
    }

    #[tokio::test]
    async fn test_restore_overflow() {
        let store = MemoryInventory::new();
        store.add_product(1, "Classic Navy Hoodie", "50.00", i32::MAX).await;

        let mut tx = store.begin().await.unwrap();
        let err = restore_lines(&mut tx, &[line(1, 1)]).await.unwrap_err();
        assert!(matches!(err, InventoryError::StockOverflow { .. }));
    }

    #[tokio::test]
    async fn test_rereserve_checks_stock() {
        let store = MemoryInventory::new();
        store.add_product(1, "Classic Navy Hoodie", "50.00", 1).await;

        let mut tx = store.begin().await.unwrap();
        let err = rereserve_lines(&mut tx, &[line(1, 2)]).await.unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock { available: 1, .. }));
    }
}
