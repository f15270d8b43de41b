//! Order placement and status changes.
//!
//! All three paths run in a single inventory transaction:
//!
//! - [`OrderService::place_order`] reserves stock, prices the lines and writes
//!   the order as `pending`.
//! - [`OrderService::cancel_order`] is the customer path: only the owner may
//!   cancel, and only while the order is `pending`.
//! - [`OrderService::change_status`] is the admin path: any status may follow
//!   any other, with stock restored or reserved again as the change implies.

use thiserror::Error;
use tracing::{info, instrument};

use cornershop_core::order::{OrderRequest, OrderRequestError, OrderTotals, PricedLine};
use cornershop_core::{OrderId, OrderStatus, ShopRates, StockEffect};

use super::catalog_cache::CatalogCache;
use super::inventory::{self, InventoryError, InventoryStore, InventoryTx};
use super::notifications::{OrderNotifier, OrderPlaced};
use crate::db::RepositoryError;
use crate::models::{CurrentUser, NewOrder, Order, OrderLine, OrderWithLines};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Request(#[from] OrderRequestError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// The acting customer does not own the order.
    #[error("order belongs to another customer")]
    NotOwner,

    #[error("Cannot cancel an order that is not pending")]
    NotPending,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order workflows over an [`InventoryStore`].
pub struct OrderService<S> {
    store: S,
    rates: ShopRates,
    notifier: Option<OrderNotifier>,
    catalog: Option<CatalogCache>,
}

impl<S: InventoryStore> OrderService<S> {
    #[must_use]
    pub const fn new(store: S, rates: ShopRates) -> Self {
        Self {
            store,
            rates,
            notifier: None,
            catalog: None,
        }
    }

    /// Emit [`OrderPlaced`] through `notifier` after each placement.
    #[must_use]
    pub fn with_notifier(mut self, notifier: OrderNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Invalidate `catalog` whenever stock changes.
    #[must_use]
    pub fn with_catalog_cache(mut self, catalog: CatalogCache) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Place an order for `customer`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Request` for an empty or malformed request and
    /// `OrderError::Inventory` if any line cannot be reserved. Nothing is
    /// written in either case.
    #[instrument(skip(self, customer, request), fields(user_id = %customer.id))]
    pub async fn place_order(
        &self,
        customer: &CurrentUser,
        request: &OrderRequest,
    ) -> Result<OrderWithLines, OrderError> {
        let lines = request.normalize()?;

        let mut tx = self.store.begin().await?;
        let items = inventory::reserve_lines(&mut tx, &lines).await?;
        let priced: Vec<PricedLine> = items.iter().map(OrderLine::priced).collect();
        let totals = OrderTotals::compute(&priced, &self.rates);

        let order = tx
            .insert_order(&NewOrder {
                user_id: customer.id,
                totals,
                status: OrderStatus::Pending,
            })
            .await?;
        tx.attach_lines(order.id, &priced).await?;
        tx.commit().await?;

        info!(order_id = %order.id, total = %order.total, lines = items.len(), "Order placed");
        self.stock_changed();

        let placed = OrderWithLines { order, items };
        if let Some(notifier) = &self.notifier {
            notifier.notify(OrderPlaced {
                order: placed.clone(),
                customer_name: customer.name.clone(),
                customer_email: customer.email.clone(),
            });
        }
        Ok(placed)
    }

    /// Cancel one of `customer`'s pending orders and put its stock back.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound`, `OrderError::NotOwner` or
    /// `OrderError::NotPending`; stock is untouched in each case.
    #[instrument(skip(self, customer), fields(user_id = %customer.id))]
    pub async fn cancel_order(
        &self,
        customer: &CurrentUser,
        order_id: OrderId,
    ) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let locked = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if locked.order.user_id != customer.id {
            return Err(OrderError::NotOwner);
        }
        if locked.order.status != OrderStatus::Pending {
            return Err(OrderError::NotPending);
        }

        inventory::restore_lines(&mut tx, &locked.lines).await?;
        let order = tx
            .set_order_status(order_id, OrderStatus::Cancelled)
            .await?;
        tx.commit().await?;

        info!(order_id = %order_id, "Order cancelled by customer");
        self.stock_changed();
        Ok(order)
    }

    /// Move an order to `status`, reconciling stock.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` for an unknown order and
    /// `OrderError::Inventory` if leaving `cancelled` finds a product short; the
    /// order then stays `cancelled` and no stock changes.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let locked = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let from = locked.order.status;
        if from == status {
            return Ok(locked.order);
        }

        let effect = from.stock_effect(status);
        match effect {
            StockEffect::Restore => inventory::restore_lines(&mut tx, &locked.lines).await?,
            StockEffect::Reserve => inventory::rereserve_lines(&mut tx, &locked.lines).await?,
            StockEffect::None => {}
        }

        let order = tx.set_order_status(order_id, status).await?;
        tx.commit().await?;

        info!(order_id = %order_id, %from, to = %status, ?effect, "Order status changed");
        if effect != StockEffect::None {
            self.stock_changed();
        }
        Ok(order)
    }

    fn stock_changed(&self) {
        if let Some(catalog) = &self.catalog {
            catalog.invalidate_all();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;

    use cornershop_core::pagination::{Page, PageParams};
    use cornershop_core::{Email, ProductId, UserId, UserRole};

    use super::*;
    use crate::db::products::ProductFilter;
    use crate::services::inventory::testing::MemoryInventory;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn customer(id: i64) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            name: format!("Customer {id}"),
            email: Email::parse(&format!("customer{id}@example.com")).unwrap(),
            role: UserRole::Customer,
        }
    }

    fn request(lines: &[(i64, i64)]) -> OrderRequest {
        OrderRequest::new(lines.iter().map(|&(id, qty)| (ProductId::new(id), qty)))
    }

    async fn shop() -> (MemoryInventory, OrderService<MemoryInventory>) {
        let store = MemoryInventory::new();
        store.add_product(1, "Classic Navy Hoodie", "50.00", 10).await;
        store.add_product(2, "Canvas Tote", "12.50", 3).await;
        let service = OrderService::new(store.clone(), ShopRates::default());
        (store, service)
    }

    #[tokio::test]
    async fn test_place_order_decrements_and_totals() {
        let (store, service) = shop().await;

        let placed = service
            .place_order(&customer(1), &request(&[(1, 2)]))
            .await
            .unwrap();

        assert_eq!(store.stock(1).await, 8);
        let order = &placed.order;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, dec("100.00"));
        assert_eq!(order.tax, dec("10.00"));
        assert_eq!(order.shipping, dec("5.00"));
        assert_eq!(order.total, dec("115.00"));
        assert_eq!(order.subtotal + order.tax + order.shipping, order.total);
        assert_eq!(placed.items.len(), 1);
        assert_eq!(placed.items[0].unit_price, dec("50.00"));

        let stored = store.order_lines(order.id).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_merged() {
        let (store, service) = shop().await;

        let placed = service
            .place_order(&customer(1), &request(&[(2, 1), (1, 1), (2, 2)]))
            .await
            .unwrap();

        assert_eq!(store.stock(2).await, 0);
        assert_eq!(store.stock(1).await, 9);
        let quantities: Vec<(i64, i32)> = placed
            .items
            .iter()
            .map(|l| (l.product_id.as_i64(), l.quantity))
            .collect();
        assert_eq!(quantities, vec![(1, 1), (2, 3)]);
    }

    #[tokio::test]
    async fn test_short_line_leaves_all_stock_unchanged() {
        let (store, service) = shop().await;

        let err = service
            .place_order(&customer(1), &request(&[(1, 5), (2, 4)]))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Not enough stock available for Canvas Tote. Available: 3"
        );
        assert_eq!(store.stock(1).await, 10);
        assert_eq!(store.stock(2).await, 3);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let (store, service) = shop().await;

        let err = service
            .place_order(&customer(1), &OrderRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Request(OrderRequestError::Empty)));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_and_keeps_totals() {
        let (store, service) = shop().await;
        let placed = service
            .place_order(&customer(1), &request(&[(1, 2), (2, 1)]))
            .await
            .unwrap();

        let cancelled = service
            .cancel_order(&customer(1), placed.order.id)
            .await
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.totals(), placed.order.totals());
        assert_eq!(store.stock(1).await, 10);
        assert_eq!(store.stock(2).await, 3);
    }

    #[tokio::test]
    async fn test_cancel_requires_owner() {
        let (store, service) = shop().await;
        let placed = service
            .place_order(&customer(1), &request(&[(1, 2)]))
            .await
            .unwrap();

        let err = service
            .cancel_order(&customer(2), placed.order.id)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotOwner));
        assert_eq!(store.stock(1).await, 8);
    }

    #[tokio::test]
    async fn test_cancel_requires_pending() {
        let (store, service) = shop().await;
        let placed = service
            .place_order(&customer(1), &request(&[(1, 2)]))
            .await
            .unwrap();
        store
            .force_status(placed.order.id, OrderStatus::Processing)
            .await;

        let err = service
            .cancel_order(&customer(1), placed.order.id)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotPending));
        assert_eq!(store.stock(1).await, 8);
    }

    #[tokio::test]
    async fn test_cancel_twice_restores_once() {
        let (store, service) = shop().await;
        let placed = service
            .place_order(&customer(1), &request(&[(1, 2)]))
            .await
            .unwrap();

        service
            .cancel_order(&customer(1), placed.order.id)
            .await
            .unwrap();
        let err = service
            .cancel_order(&customer(1), placed.order.id)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotPending));
        assert_eq!(store.stock(1).await, 10);
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let (_, service) = shop().await;
        let err = service
            .cancel_order(&customer(1), OrderId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(id) if id == OrderId::new(404)));
    }

    #[tokio::test]
    async fn test_admin_cancel_then_reinstate() {
        let (store, service) = shop().await;
        let placed = service
            .place_order(&customer(1), &request(&[(1, 4)]))
            .await
            .unwrap();
        let id = placed.order.id;

        service
            .change_status(id, OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(store.stock(1).await, 6);

        service
            .change_status(id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(store.stock(1).await, 10);

        let order = service
            .change_status(id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(store.stock(1).await, 6);
    }

    #[tokio::test]
    async fn test_reinstate_without_stock_keeps_cancelled() {
        let (store, service) = shop().await;
        let first = service
            .place_order(&customer(1), &request(&[(1, 1), (2, 2)]))
            .await
            .unwrap();
        service
            .change_status(first.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        // Someone else buys the totes in the meantime.
        service
            .place_order(&customer(2), &request(&[(2, 2)]))
            .await
            .unwrap();
        assert_eq!(store.stock(1).await, 10);
        assert_eq!(store.stock(2).await, 1);

        let err = service
            .change_status(first.order.id, OrderStatus::Pending)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::Inventory(InventoryError::InsufficientStock { available: 1, .. })
        ));
        assert_eq!(
            store.order(first.order.id).await.unwrap().status,
            OrderStatus::Cancelled
        );
        assert_eq!(store.stock(1).await, 10);
        assert_eq!(store.stock(2).await, 1);
    }

    #[tokio::test]
    async fn test_same_status_is_a_no_op() {
        let (store, service) = shop().await;
        let placed = service
            .place_order(&customer(1), &request(&[(1, 1)]))
            .await
            .unwrap();

        let order = service
            .change_status(placed.order.id, OrderStatus::Pending)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(store.stock(1).await, 9);
    }

    #[tokio::test]
    async fn test_concurrent_orders_for_last_unit() {
        let store = MemoryInventory::new();
        store.add_product(1, "Last Hoodie", "50.00", 1).await;
        let service = Arc::new(OrderService::new(store.clone(), ShopRates::default()));

        let a = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.place_order(&customer(1), &request(&[(1, 1)])).await }
        });
        let b = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.place_order(&customer(2), &request(&[(1, 1)])).await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.stock(1).await, 0);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_place_order_notifies_and_invalidates_cache() {
        let (_, service) = shop().await;
        let (notifier, mut receiver) = OrderNotifier::channel();
        let cache = CatalogCache::new(Duration::from_secs(60));
        cache
            .insert(
                ProductFilter::default(),
                PageParams::default(),
                Arc::new(Page::new(vec![], PageParams::default(), 0)),
                cache.ticket(),
            )
            .await;
        let service = service
            .with_notifier(notifier)
            .with_catalog_cache(cache.clone());

        let placed = service
            .place_order(&customer(1), &request(&[(1, 1)]))
            .await
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.order, placed);
        assert_eq!(event.customer_email.as_str(), "customer1@example.com");
        assert!(
            cache
                .get(&ProductFilter::default(), PageParams::default())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_failed_order_does_not_notify() {
        let (_, service) = shop().await;
        let (notifier, mut receiver) = OrderNotifier::channel();
        let service = service.with_notifier(notifier);

        service
            .place_order(&customer(1), &request(&[(1, 50)]))
            .await
            .unwrap_err();

        assert!(receiver.try_recv().is_err());
    }
}
