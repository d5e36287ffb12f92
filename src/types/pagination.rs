use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

/// Page request for offset-based listing. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pageable {
    pub page: u64,
    pub per_page: u64,
}

impl Pageable {
    /// A zero `per_page` falls back to the default; larger values are capped.
    #[must_use]
    pub fn new(page: u64, per_page: u64) -> Self {
        let per_page = match per_page {
            0 => DEFAULT_PER_PAGE,
            n => n.min(MAX_PER_PAGE),
        };
        Self { page, per_page }
    }

    /// `(page - 1) * per_page`. Page 0 reads from the start; the result
    /// saturates instead of overflowing.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Summary returned alongside a page of results.
///
/// `next` is never clamped to `total_page`, and `prev` floors at the current
/// page for the first page; clients rely on both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationData {
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub prev: u64,
    pub next: u64,
    pub total_page: u64,
}

impl PaginationData {
    #[must_use]
    pub fn new(pageable: &Pageable, total: u64) -> Self {
        Self {
            total,
            page: pageable.page,
            per_page: pageable.per_page,
            prev: prev_page(pageable.page),
            next: pageable.page.saturating_add(1),
            total_page: total_pages(total, pageable.per_page),
        }
    }
}

#[must_use]
pub fn prev_page(page: u64) -> u64 {
    if page == 0 {
        return 1;
    }
    if page - 1 == 0 { page } else { page - 1 }
}

#[must_use]
pub fn total_pages(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page)
}
