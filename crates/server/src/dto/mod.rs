//! # Data Transfer Objects
//!
//! Request and response types for the HTTP surface.

pub mod auth;
pub mod billing;
pub mod invitations;
pub mod organizations;
pub mod teams;
pub mod users;

use serde::Deserialize;

/// Common query parameters for paginated list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    /// Page number (1-based, default: 1)
    pub page:     Option<u64>,
    /// Items per page (default: 20, max: 100)
    pub per_page: Option<u64>,
    /// Sort field (entity-specific; defaults to name/created order)
    pub sort:     Option<String>,
    /// Search term applied to the entity's searchable fields
    pub search:   Option<String>,
}

impl ListQuery {
    /// Get page number (1-based, default: 1)
    pub fn page(&self) -> u64 { self.page.unwrap_or(1).max(1) }

    /// Get items per page (default: 20, max: 100)
    pub fn per_page(&self) -> u64 { self.per_page.unwrap_or(20).clamp(1, 100) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let q = ListQuery {
            page:     None,
            per_page: None,
            sort:     None,
            search:   None,
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), 20);
    }

    #[test]
    fn test_list_query_clamp() {
        let q = ListQuery {
            page:     Some(0),
            per_page: Some(1000),
            sort:     None,
            search:   None,
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), 100);
    }
}
