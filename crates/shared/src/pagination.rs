//! Page-based pagination utilities.

use serde::{Deserialize, Serialize};

/// Upper bound for any page size accepted from a caller.
pub const MAX_PER_PAGE: i64 = 100;

/// A normalised page request.
///
/// `page` is 1-based and never below 1; `per_page` is clamped to
/// `1..=MAX_PER_PAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Builds a page request from optional caller input, falling back to
    /// `default_per_page` when no size was given.
    pub fn new(page: Option<i64>, per_page: Option<i64>, default_per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(default_per_page)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// Number of rows to fetch.
    pub fn limit(&self) -> i64 {
        self.per_page
    }

    /// Total number of pages needed for `total` rows.
    pub fn total_pages(&self, total: i64) -> i64 {
        total_pages(total, self.per_page)
    }
}

/// Total number of pages needed for `total` rows at `per_page` rows each.
pub fn total_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 || per_page <= 0 {
        return 0;
    }
    (total + per_page - 1) / per_page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageRequest::new(None, None, 9);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 9);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_floor() {
        assert_eq!(PageRequest::new(Some(0), None, 10).page, 1);
        assert_eq!(PageRequest::new(Some(-4), None, 10).page, 1);
    }

    #[test]
    fn test_per_page_clamped() {
        assert_eq!(PageRequest::new(None, Some(0), 10).per_page, 1);
        assert_eq!(PageRequest::new(None, Some(500), 10).per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_offset() {
        let page = PageRequest::new(Some(3), Some(9), 9);
        assert_eq!(page.offset(), 18);
        assert_eq!(page.limit(), 9);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(PageRequest::new(None, Some(9), 9).total_pages(19), 3);
    }
}
