//! Pagination query parameters and paged list responses.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// `page` / `pageSize` query parameters.
///
/// Never rejects: out-of-range or unparseable values fall back to the
/// defaults (page 1, page size 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Parse from a raw query string (without the leading `?`).
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut pagination = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "page" => {
                    pagination.page = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|p| *p >= 1)
                        .unwrap_or(DEFAULT_PAGE);
                }
                "pageSize" => {
                    pagination.page_size = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
                        .unwrap_or(DEFAULT_PAGE_SIZE);
                }
                _ => {}
            }
        }
        pagination
    }

    /// Row offset for SQL `OFFSET`.
    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }

    /// Row limit for SQL `LIMIT`.
    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.page_size)
    }
}

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.uri.query().map_or_else(Self::default, Self::from_query))
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, pagination: Pagination, total: u64) -> Self {
        let size = u64::from(pagination.page_size.max(1));
        Self {
            items,
            page: pagination.page,
            page_size: pagination.page_size,
            total,
            total_pages: total.div_ceil(size),
        }
    }

    /// Convert every item, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        assert_eq!(Pagination::from_query(""), Pagination::default());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let p = Pagination::from_query("page=abc&pageSize=999");
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 10);

        let p = Pagination::from_query("page=0&pageSize=0");
        assert_eq!((p.page, p.page_size), (1, 10));

        let p = Pagination::from_query("page=-3&pageSize=-1");
        assert_eq!((p.page, p.page_size), (1, 10));
    }

    #[test]
    fn test_valid_values_kept() {
        let p = Pagination::from_query("page=3&pageSize=100&sort=name");
        assert_eq!((p.page, p.page_size), (3, 100));
        assert_eq!(p.offset(), 200);
        assert_eq!(p.limit(), 100);
    }

    #[test]
    fn test_page_total_pages() {
        let page = Page::new(vec![1, 2], Pagination::from_query("pageSize=2"), 5);
        assert_eq!(page.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], Pagination::default(), 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let page = Page::new(vec!["a"], Pagination::default(), 1);
        let json = serde_json::to_value(&page).unwrap_or_default();
        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["totalPages"], 1);
    }
}
