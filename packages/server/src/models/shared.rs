use serde::{Deserialize, Serialize};

/// Pagination metadata included in list responses.
#[derive(Debug, Serialize)]
pub struct Pagination {
    /// Current page number (1-based).
    pub page: u64,
    pub per_page: u64,
    /// Total number of matching items across all pages.
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// Highest page a list request can ask for. Keeps the row offset well inside
/// the range every backend accepts.
pub const MAX_PAGE: u64 = 1_000_000;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PageParams {
    /// `(page, per_page)` with the page in `1..=MAX_PAGE` and at most 100 items.
    pub fn resolve(&self) -> (u64, u64) {
        (
            self.page.unwrap_or(1).clamp(1, MAX_PAGE),
            self.per_page.unwrap_or(20).clamp(1, 100),
        )
    }

    /// Row offset of the resolved page.
    pub fn offset(page: u64, per_page: u64) -> u64 {
        page.saturating_sub(1).saturating_mul(per_page)
    }
}
