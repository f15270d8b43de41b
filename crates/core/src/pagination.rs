//! Page-number pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_PER_PAGE: u32 = 10;
/// Largest page size a client may ask for.
pub const MAX_PER_PAGE: u32 = 100;

/// `?page=&per_page=` query parameters.
///
/// Both are optional; out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    #[must_use]
    pub const fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// 1-based page number, at least 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// `LIMIT` for the page query.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    /// `OFFSET` for the page query.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }
}

/// One page of results plus the counters clients use to navigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl<T> Page<T> {
    /// Wrap a fetched slice. `total` is the row count across all pages.
    #[must_use]
    pub fn new(data: Vec<T>, params: PageParams, total: u64) -> Self {
        let per_page = params.per_page();
        let last_page = u32::try_from(total.div_ceil(u64::from(per_page)))
            .unwrap_or(u32::MAX)
            .max(1);

        Self {
            data,
            current_page: params.page(),
            per_page,
            total,
            last_page,
        }
    }

    /// Transform the items, keeping the counters.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
        }
    }
}
