//! Cache of public product listing pages.
//!
//! Keyed by the normalized filter plus page parameters. Any write that changes
//! what a listing shows (product or category edits, stock changes from orders)
//! drops every entry.
//!
//! A listing read from the database is only cached if no invalidation ran
//! while it was being read; see [`CatalogCache::ticket`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;

use cornershop_core::pagination::{Page, PageParams};

use crate::db::products::ProductFilter;
use crate::models::Product;

const MAX_ENTRIES: u64 = 1_000;

type CacheKey = (ProductFilter, PageParams);

/// Invalidation generation observed before a database read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTicket(u64);

/// Shared product listing cache.
#[derive(Clone)]
pub struct CatalogCache {
    pages: Cache<CacheKey, Arc<Page<Product>>>,
    generation: Arc<AtomicU64>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            pages: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Take before reading the listing that will be passed to
    /// [`CatalogCache::insert`].
    #[must_use]
    pub fn ticket(&self) -> CacheTicket {
        CacheTicket(self.generation.load(Ordering::SeqCst))
    }

    pub async fn get(&self, filter: &ProductFilter, params: PageParams) -> Option<Arc<Page<Product>>> {
        self.pages.get(&(filter.clone(), params)).await
    }

    /// Cache `page` unless an invalidation has run since `ticket` was taken.
    pub async fn insert(
        &self,
        filter: ProductFilter,
        params: PageParams,
        page: Arc<Page<Product>>,
        ticket: CacheTicket,
    ) {
        if self.ticket() != ticket {
            tracing::debug!("Product listing changed during read; not cached");
            return;
        }
        let key = (filter, params);
        self.pages.insert(key.clone(), page).await;

        // An invalidation between the check and the insert bumped the
        // generation before clearing, so one of the two removes the entry.
        if self.ticket() != ticket {
            self.pages.invalidate(&key).await;
        }
    }

    /// Drop every cached page.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pages.invalidate_all();
        tracing::debug!("Product listing cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Arc<Page<Product>> {
        Arc::new(Page::new(vec![], PageParams::default(), 0))
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = CatalogCache::new(Duration::from_secs(60));
        let filter = ProductFilter::default();

        cache
            .insert(filter.clone(), PageParams::default(), page(), cache.ticket())
            .await;

        assert!(cache.get(&filter, PageParams::default()).await.is_some());
        assert!(cache.get(&filter, PageParams::new(2, 10)).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = CatalogCache::new(Duration::from_secs(60));
        let filter = ProductFilter::default();
        cache
            .insert(filter.clone(), PageParams::default(), page(), cache.ticket())
            .await;

        cache.invalidate_all();

        assert!(cache.get(&filter, PageParams::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_page_read_across_invalidation_is_not_cached() {
        let cache = CatalogCache::new(Duration::from_secs(60));
        let filter = ProductFilter::default();

        let ticket = cache.ticket();
        // An order commits while the listing is being read.
        cache.invalidate_all();
        cache
            .insert(filter.clone(), PageParams::default(), page(), ticket)
            .await;

        assert!(cache.get(&filter, PageParams::default()).await.is_none());

        cache
            .insert(filter.clone(), PageParams::default(), page(), cache.ticket())
            .await;
        assert!(cache.get(&filter, PageParams::default()).await.is_some());
    }
}
