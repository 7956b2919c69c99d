//! # Meridian API Server
//!
//! Axum-based HTTP API server for the Meridian multi-tenant platform.
//!
//! ## Modules
//!
//! - [`middleware`]: identity resolution and tenant context injection
//! - [`guards`]: DB-backed wrappers around the pure authorization guards
//! - [`gate`]: subscription gate and quota reservation
//! - [`handlers`]: request handlers per resource
//! - [`router`]: API route configuration
//! - [`sweep`]: the daily trial-expiry sweep

use std::sync::Arc;

use auth::JwtConfig;
use billing::{BillingConfig, BillingService};

pub mod cache;
pub mod dto;
pub mod email;
pub mod gate;
pub mod guards;
pub mod handlers;
pub mod ids;
pub mod middleware;
pub mod refresh_tokens;
pub mod router;
pub mod sweep;
pub mod utils;

pub use router::create_app_router;

/// Application state shared across request handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db:             sea_orm::DbConn,
    /// JWT configuration
    pub jwt_config:     JwtConfig,
    /// Redis client for the read-through cache
    pub redis:          redis::Client,
    /// Billing provider
    pub billing:        Arc<dyn BillingService>,
    /// Billing configuration (trial length, webhook secret)
    pub billing_config: BillingConfig,
    /// Outbound email sender
    pub mailer:         email::Mailer,
    /// Server start time for uptime reporting
    pub start_time:     std::time::Instant,
}

impl AppState {
    /// Build an application state from its parts.
    pub fn new(
        db: sea_orm::DbConn,
        jwt_config: JwtConfig,
        redis: redis::Client,
        billing: Arc<dyn BillingService>,
        billing_config: BillingConfig,
        mailer: email::Mailer,
    ) -> Self {
        Self {
            db,
            jwt_config,
            redis,
            billing,
            billing_config,
            mailer,
            start_time: std::time::Instant::now(),
        }
    }
}
