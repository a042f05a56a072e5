//! Page requests and pagination metadata.
//!
//! Pagination input is never an error: anything that is not a positive
//! integer falls back to the default, and oversized limits are clamped.
//! That way a bad query string can never turn into a negative skip.

use serde::{Deserialize, Serialize};

/// Page size used when the caller supplies none (or an invalid one).
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Upper bound on the page size a caller may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Bounds applied when sanitizing a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl PageLimits {
    /// Create page limits. Both bounds are raised to at least 1 and the
    /// default never exceeds the maximum.
    #[must_use]
    pub fn new(default_limit: u64, max_limit: u64) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        }
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

/// A sanitized page request: `page >= 1` and `1 <= limit <= max_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Build a page request from already-numeric input.
    ///
    /// A zero page becomes page 1, a zero limit becomes the default limit and
    /// a limit above the maximum is clamped.
    #[must_use]
    pub fn new(page: u64, limit: u64, limits: PageLimits) -> Self {
        let page = if page == 0 { 1 } else { page };
        let limit = if limit == 0 {
            limits.default_limit
        } else {
            limit.min(limits.max_limit)
        };
        Self { page, limit }
    }

    /// Build a page request from raw query-string values.
    ///
    /// Missing, non-numeric, zero or negative values fall back to the
    /// defaults (page 1, `limits.default_limit`).
    #[must_use]
    pub fn from_raw(page: Option<&str>, limit: Option<&str>, limits: PageLimits) -> Self {
        Self::new(
            parse_positive(page).unwrap_or(1),
            parse_positive(limit).unwrap_or(limits.default_limit),
            limits,
        )
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    /// The page size.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of records preceding this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// The `(offset, limit)` window this page selects.
    #[must_use]
    pub const fn window(&self) -> PageWindow {
        PageWindow {
            offset: self.offset(),
            limit: self.limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE, PageLimits::default())
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

/// An `(offset, limit)` slice of an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// The whole result set.
    pub const ALL: Self = Self {
        offset: 0,
        limit: u64::MAX,
    };

    /// The first `limit` entries.
    #[must_use]
    pub const fn first(limit: u64) -> Self {
        Self { offset: 0, limit }
    }

    /// Apply the window to an ordered sequence.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// Pagination metadata for a customer page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_customers: u64,
    pub per_page: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationInfo {
    /// Compute pagination metadata for `request` over `total` matching records.
    #[must_use]
    pub const fn new(request: &PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.limit);
        Self {
            current_page: request.page,
            total_pages,
            total_customers: total,
            per_page: request.limit,
            has_next_page: request.page < total_pages,
            has_prev_page: request.page > 1,
        }
    }
}

/// Pagination metadata for an order page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaginationInfo {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_orders: u64,
    pub per_page: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl OrderPaginationInfo {
    /// Compute pagination metadata for `request` over `total` matching orders.
    #[must_use]
    pub const fn new(request: &PageRequest, total: u64) -> Self {
        let info = PaginationInfo::new(request, total);
        Self {
            current_page: info.current_page,
            total_pages: info.total_pages,
            total_orders: info.total_customers,
            per_page: info.per_page,
            has_next_page: info.has_next_page,
            has_prev_page: info.has_prev_page,
        }
    }
}
