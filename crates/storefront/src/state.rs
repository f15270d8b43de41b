//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use cornershop_core::ShopRates;

use crate::config::StorefrontConfig;
use crate::db::PgInventory;
use crate::services::catalog_cache::CatalogCache;
use crate::services::email::EmailService;
use crate::services::notifications::{LogMailer, OrderNotifier};
use crate::services::orders::OrderService;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: CatalogCache,
    notifier: OrderNotifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Spawns the order notification worker, so this must run inside a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if SMTP is configured but the relay is invalid.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let catalog = CatalogCache::new(config.product_cache_ttl);

        let admin_address = config.mail.admin_address.clone();
        let notifier = match &config.mail.smtp {
            Some(smtp) => OrderNotifier::spawn(EmailService::new(smtp)?, admin_address),
            None => {
                tracing::warn!("SMTP_HOST not set; order notifications will only be logged");
                OrderNotifier::spawn(LogMailer, admin_address)
            }
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                notifier,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Tax and shipping rates applied to new orders.
    #[must_use]
    pub fn rates(&self) -> &ShopRates {
        &self.inner.config.rates
    }

    /// Cache of public product listing pages.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Order workflows against the database.
    #[must_use]
    pub fn orders(&self) -> OrderService<PgInventory> {
        OrderService::new(PgInventory::new(self.inner.pool.clone()), *self.rates())
            .with_notifier(self.inner.notifier.clone())
            .with_catalog_cache(self.inner.catalog.clone())
    }
}
