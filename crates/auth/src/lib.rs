//! # Authentication and Authorization
//!
//! Authentication and authorization building blocks:
//! - JWT token management
//! - Password hashing and validation
//! - The static role/permission table
//! - The immutable request identity and the pure guard chain

pub mod guards;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod rbac;

// Re-export commonly used types
pub use guards::{any_of, GuardDecision, TeamRef};
pub use identity::Identity;
pub use jwt::{create_access_token, extract_bearer_token, validate_token, Claims, JwtConfig};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use rbac::{has_all_permissions, has_any_permission, has_permission, Permission};
pub use secrecy;
pub use subtle;
