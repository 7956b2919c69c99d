//! # Request Handlers
//!
//! One module per resource. Handlers take `(&AppState, Identity, args)` and
//! are wired to routes by thin wrappers in the router module.

pub mod auth;
pub mod billing;
pub mod invitations;
pub mod organizations;
pub mod teams;
pub mod users;
