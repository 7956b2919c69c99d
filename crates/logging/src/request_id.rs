//! # Request ID Tracking
//!
//! Collision-resistant, URL-safe request identifiers propagated via the
//! `x-request-id` header and attached to request extensions.

/// A request ID backed by a CUID2 string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random request ID.
    #[inline]
    pub fn new() -> Self { Self(cuid2::create_id()) }

    /// Get the request ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str { &self.0 }

    /// Consume and return the inner string.
    #[inline]
    pub fn into_string(self) -> String { self.0 }

    /// Parse a request ID from an incoming header value.
    ///
    /// Accepts alphanumeric ids (plus `-`/`_`) of a sane length so a caller
    /// can carry its own correlation id through the system.
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        if (8 ..= 64).contains(&value.len()) &&
            value
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            Some(Self(value.to_string()))
        }
        else {
            None
        }
    }
}

impl Default for RequestId {
    #[inline]
    fn default() -> Self { Self::new() }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_unique() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new();
        assert_eq!(format!("{}", id), id.as_str());
    }

    #[test]
    fn test_from_header_valid() {
        let id = RequestId::from_header("k192v2g4w3zq8h6j5k12");
        assert!(id.is_some());
    }

    #[test]
    fn test_from_header_rejects_garbage() {
        assert!(RequestId::from_header("bad id!").is_none());
        assert!(RequestId::from_header("x").is_none());
        assert!(RequestId::from_header(&"a".repeat(100)).is_none());
    }
}
