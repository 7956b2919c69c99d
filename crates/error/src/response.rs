//! # API Response Types
//!
//! Generic API response envelope for the Meridian platform.
//! Every endpoint responds with the same shape:
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "Teams retrieved successfully",
//!   "data": [ ... ],
//!   "meta": { "page": 1, "limit": 20, "total": 42, "totalPage": 3 }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (1-indexed).
    pub page:       u64,
    /// Number of items per page.
    pub limit:      u64,
    /// Total number of items.
    pub total:      u64,
    /// Total number of pages.
    pub total_page: u64,
}

impl PaginationMeta {
    /// Upper bound on page numbers; keeps the offset arithmetic safe.
    const MAX_PAGE: u64 = 1_000_000;

    /// Create pagination metadata from a 1-based page, a page size and the
    /// total item count. `page` is clamped into `[1, MAX_PAGE]` and `limit`
    /// into `[1, ..]` so `total_page` never divides by zero.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let page = page.clamp(1, Self::MAX_PAGE);
        let limit = limit.max(1);
        let total_page = total.div_ceil(limit);
        Self {
            page,
            limit,
            total,
            total_page,
        }
    }

    /// Offset for database queries.
    pub fn offset(&self) -> u64 { (self.page - 1).saturating_mul(self.limit) }

    /// Whether a page beyond the current one exists.
    pub fn has_next(&self) -> bool { self.page < self.total_page }
}

/// The response envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded.
    pub success: bool,

    /// Human-readable outcome description.
    pub message: String,

    /// Response payload; omitted on empty success and on errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Pagination metadata for list responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T> ApiResponse<T> {
    /// Success response with data.
    #[inline]
    pub fn ok(message: impl ToString, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data:    Some(data),
            meta:    None,
        }
    }

    /// Success response without a payload.
    #[inline]
    pub fn message(message: impl ToString) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data:    None,
            meta:    None,
        }
    }

    /// Paginated success response.
    #[inline]
    pub fn paginated(message: impl ToString, data: T, meta: PaginationMeta) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data:    Some(data),
            meta:    Some(meta),
        }
    }

    /// Error response.
    #[inline]
    pub fn error(message: impl ToString) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            data:    None,
            meta:    None,
        }
    }

    /// Map the payload to a different type.
    #[inline]
    pub fn map<U, F>(self, f: F) -> ApiResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ApiResponse {
            success: self.success,
            message: self.message,
            data:    self.data.map(f),
            meta:    self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_ok() {
        let response = ApiResponse::ok("done", vec![1, 2, 3]);
        assert!(response.success);
        assert_eq!(response.data, Some(vec![1, 2, 3]));
        assert!(response.meta.is_none());
    }

    #[test]
    fn test_response_error_has_no_data() {
        let response: ApiResponse<()> = ApiResponse::error("Team not found");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message, "Team not found");
    }

    #[test]
    fn test_response_serialization_skips_empty_fields() {
        let response: ApiResponse<()> = ApiResponse::message("ok");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(!json.contains("\"data\""));
        assert!(!json.contains("\"meta\""));
    }

    #[test]
    fn test_paginated_response_serialization() {
        let meta = PaginationMeta::new(2, 10, 25);
        let response = ApiResponse::paginated("page two", vec!["a", "b"], meta);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"totalPage\":3"));
        assert!(json.contains("\"page\":2"));
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(1, 10, 100);
        assert_eq!(meta.total_page, 10);
        assert_eq!(meta.offset(), 0);
        assert!(meta.has_next());
    }

    #[test]
    fn test_pagination_last_page() {
        let meta = PaginationMeta::new(10, 10, 100);
        assert_eq!(meta.offset(), 90);
        assert!(!meta.has_next());
    }

    #[test]
    fn test_pagination_empty_total() {
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.total_page, 0);
        assert!(!meta.has_next());
    }

    #[test]
    fn test_pagination_clamps_page_zero() {
        let meta = PaginationMeta::new(0, 10, 100);
        assert_eq!(meta.page, 1);
        assert_eq!(meta.offset(), 0);
    }

    #[test]
    fn test_pagination_clamps_limit_zero() {
        let meta = PaginationMeta::new(1, 0, 100);
        assert_eq!(meta.limit, 1);
        assert_eq!(meta.total_page, 100);
    }

    #[test]
    fn test_pagination_uneven_division() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.total_page, 3);
    }

    #[test]
    fn test_map() {
        let response = ApiResponse::ok("n", 21);
        let mapped = response.map(|n| n * 2);
        assert_eq!(mapped.data, Some(42));
        assert!(mapped.success);
    }
}
