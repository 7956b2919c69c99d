//! # HTTP Middleware
//!
//! Request processing layers: identity resolution, tenant context
//! injection and request-id propagation.

pub mod auth;
pub mod request_id;
pub mod tenant;
