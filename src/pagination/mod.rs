//! Pagination engine.
//!
//! Converts a page/limit request into a `[skip, skip + limit)` window over an
//! ordered result set and computes the navigation metadata returned with it.

use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 9;
pub const MAX_LIMIT: u32 = 50;

/// A validated page request: `page >= 1`, `1 <= limit <= MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Returns `None` when either bound is violated.
    pub fn new(page: u32, limit: u32) -> Option<Self> {
        if page < 1 || limit < 1 || limit > MAX_LIMIT {
            return None;
        }
        Some(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of matching records before the window.
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Navigation metadata for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(u64::from(request.limit));
        let current_page = request.page;

        Self {
            current_page,
            total_pages,
            total_items,
            has_next_page: u64::from(current_page) < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

/// A window of items plus its navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::new(request, 0),
        }
    }
}
