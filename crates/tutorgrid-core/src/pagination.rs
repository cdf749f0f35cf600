//! Pagination parameters for remote list endpoints.
//!
//! List calls (`GET /allocations`, `GET /students`, ...) accept `limit` and
//! either `offset` or `page`. When `page` is provided it takes precedence over
//! `offset`. Responses may carry a [`PaginationMeta`] block alongside `data`.

use serde::{Deserialize, Serialize};

/// Metadata about a paginated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Total number of items across all pages
    pub total: i64,
    /// Maximum items per page (the limit that was applied)
    pub limit: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    /// Whether there are more items after this page
    pub has_more: bool,
}

/// Query parameters for pagination.
///
/// - `limit` is clamped to the range [1, 100]
/// - `offset` is clamped to a minimum of 0
/// - `page` is clamped to a minimum of 1
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: Some(50),
            offset: None,
            page: Some(1),
        }
    }
}

impl PaginationParams {
    pub fn page(page: i64, limit: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
            page: Some(page),
        }
    }

    /// Returns the effective limit, clamped to [1, 100]. Defaults to 50.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }

    /// Returns the effective offset, derived from `page` when present.
    #[must_use]
    pub fn offset(&self) -> i64 {
        if let Some(page) = self.page {
            (page.max(1) - 1) * self.limit()
        } else {
            self.offset.unwrap_or(0).max(0)
        }
    }

    /// Query pairs for the HTTP client, normalized to `limit` + `offset`.
    pub fn as_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("limit", self.limit().to_string()),
            ("offset", self.offset().to_string()),
        ]
    }

    /// The parameters for the page after `meta`, if there is one. Advances by
    /// the limit the server applied, which may be lower than requested.
    pub fn next(&self, meta: &PaginationMeta) -> Option<Self> {
        if !meta.has_more {
            return None;
        }
        Some(Self {
            limit: Some(self.limit()),
            offset: Some(self.offset() + meta.limit.clamp(1, self.limit())),
            page: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamped() {
        let params = PaginationParams {
            limit: Some(500),
            offset: None,
            page: None,
        };
        assert_eq!(params.limit(), 100);

        let params = PaginationParams {
            limit: Some(0),
            offset: None,
            page: None,
        };
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn test_page_takes_precedence_over_offset() {
        let params = PaginationParams {
            limit: Some(20),
            offset: Some(5),
            page: Some(3),
        };
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn test_negative_offset_clamped() {
        let params = PaginationParams {
            limit: Some(10),
            offset: Some(-4),
            page: None,
        };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_next_page() {
        let params = PaginationParams::page(1, 25);
        let meta = PaginationMeta {
            total: 60,
            limit: 25,
            offset: Some(0),
            page: Some(1),
            has_more: true,
        };
        let next = params.next(&meta).unwrap();
        assert_eq!(next.offset(), 25);

        let last = PaginationMeta {
            has_more: false,
            ..meta
        };
        assert!(params.next(&last).is_none());
    }

    #[test]
    fn test_next_page_follows_server_cap() {
        let params = PaginationParams::default();
        let capped = PaginationMeta {
            total: 30,
            limit: 10,
            offset: Some(0),
            page: None,
            has_more: true,
        };
        let next = params.next(&capped).unwrap();
        assert_eq!(next.offset(), 10);
        assert_eq!(next.limit(), 50);
    }

    #[test]
    fn test_meta_skips_absent_fields() {
        let meta = PaginationMeta {
            total: 3,
            limit: 10,
            offset: None,
            page: None,
            has_more: false,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("offset"));
        assert!(!json.contains("page"));
    }
}
