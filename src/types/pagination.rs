//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::config::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Pagination query parameters shared by every list endpoint
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number, starting at 1
    #[serde(default = "default_page")]
    pub page: u64,
    /// Items per page (capped at 100)
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    DEFAULT_PAGE_NUMBER
}

fn default_per_page() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl PaginationParams {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    /// Zero-based page index as used by SeaORM paginators
    pub fn page_index(&self) -> u64 {
        self.page.max(1) - 1
    }

    /// Calculate offset for database query
    pub fn offset(&self) -> u64 {
        self.page_index() * self.limit()
    }

    /// Get limit capped at maximum (and never zero)
    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PAGE_SIZE)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE_NUMBER,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    /// Create new paginated response
    pub fn new(data: Vec<T>, page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = if per_page > 0 {
            total.div_ceil(per_page)
        } else {
            0
        };

        Self {
            data,
            meta: PaginationMeta {
                page,
                per_page,
                total,
                total_pages,
            },
        }
    }

    /// Build from query params, using the effective (capped) page size
    pub fn from_params(data: Vec<T>, params: &PaginationParams, total: u64) -> Self {
        Self::new(data, params.page.max(1), params.limit(), total)
    }

    /// Convert the items while keeping the metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let params = PaginationParams::new(3, 10);
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 10);
        assert_eq!(params.page_index(), 2);
    }

    #[test]
    fn test_limit_is_capped() {
        let params = PaginationParams::new(1, 10_000);
        assert_eq!(params.limit(), MAX_PAGE_SIZE);
        assert_eq!(PaginationParams::new(1, 0).limit(), 1);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let params = PaginationParams::new(0, 20);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page: Paginated<u8> = Paginated::new(vec![], 1, 20, 41);
        assert_eq!(page.meta.total_pages, 3);
        let empty: Paginated<u8> = Paginated::new(vec![], 1, 20, 0);
        assert_eq!(empty.meta.total_pages, 0);
    }

    #[test]
    fn test_map_keeps_meta() {
        let page = Paginated::new(vec![1, 2], 2, 2, 4).map(|n| n * 10);
        assert_eq!(page.data, vec![10, 20]);
        assert_eq!(page.meta.page, 2);
        assert_eq!(page.meta.total_pages, 2);
    }
}
