//! Shared pagination types
//!
//! List endpoints answer with `{ data, meta }` where `meta` is a
//! [`PaginationMeta`]. Pages are 1-based.
//!
//! ```rust
//! use shelf_server::pagination::PaginationMeta;
//!
//! let meta = PaginationMeta::new(2, 20, 100);
//! assert_eq!(meta.total_pages, 5);
//! assert!(meta.has_next && meta.has_previous);
//! ```

use serde::{Deserialize, Serialize};

/// Default number of items per page
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Largest page size a caller may request
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Pagination metadata returned alongside a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PaginationMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total <= 0 || limit <= 0 {
            0
        } else {
            (total + limit - 1) / limit
        };

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: i64, limit: i64, total: i64) -> Self {
        Self {
            data,
            meta: PaginationMeta::new(page, limit, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_page() {
        let meta = PaginationMeta::new(2, 20, 100);
        assert_eq!(meta.total_pages, 5);
        assert!(meta.has_next);
        assert!(meta.has_previous);
    }

    #[test]
    fn test_partial_last_page() {
        let meta = PaginationMeta::new(3, 20, 41);
        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_next);
        assert!(meta.has_previous);
    }

    #[test]
    fn test_empty_result() {
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_previous);
    }

    #[test]
    fn test_serialized_shape() {
        let page = Paginated::new(vec![1, 2], 1, 2, 3);
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["data"], serde_json::json!([1, 2]));
        assert_eq!(value["meta"]["total_pages"], 2);
        assert_eq!(value["meta"]["has_next"], true);
        assert_eq!(value["meta"]["has_previous"], false);
    }
}
