//! # Server Bootstrap
//!
//! Builds the application state from the environment and runs the HTTP
//! server.

use std::sync::Arc;

use auth::JwtConfig;
use billing::{BillingConfig, StubBillingService};
use error::{AppError, Result};
use server::{email::{EmailConfig, Mailer}, AppState};

use crate::config;

/// Build the shared application state from the environment.
pub async fn build_state() -> Result<AppState> {
    let database_url =
        config::database_url().map_err(|e| AppError::config(e.to_string()))?;

    logging::info!(target: "serve", "Connecting to database...");
    let db = migration::connect_to_database(&database_url)
        .await
        .map_err(|e| AppError::config(format!("Failed to connect to database: {}", e)))?;

    let redis_url =
        std::env::var("MERIDIAN_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let redis = redis::Client::open(redis_url)
        .map_err(|e| AppError::config(format!("Invalid Redis URL: {}", e)))?;

    let jwt_config = JwtConfig::from_env()?;

    let billing_config = match BillingConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            logging::warn!(target: "serve", error = %e, "Billing not configured, using development defaults");
            BillingConfig::test()
        },
    };

    let mailer = Mailer::new(EmailConfig::from_env());

    Ok(AppState::new(
        db,
        jwt_config,
        redis,
        Arc::new(StubBillingService),
        billing_config,
        mailer,
    ))
}

/// Run pending migrations against the configured database.
pub async fn run_migrations(state: &AppState) -> Result<()> {
    use migration::MigratorTrait;

    migration::Migrator::up(&state.db, None)
        .await
        .map_err(|e| AppError::migration(e.to_string()))?;
    Ok(())
}

/// Start the HTTP server and serve until shutdown.
pub async fn serve(state: AppState, host: &str, port: u16, with_scheduler: bool) -> Result<()> {
    let addr = config::parse_socket_addr(host, port)
        .map_err(|e| AppError::config(format!("Invalid bind address: {}", e)))?;

    if with_scheduler {
        let hour_utc = std::env::var("MERIDIAN_SWEEP_HOUR_UTC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let _sweeper = server::sweep::spawn_daily_sweep(state.clone(), hour_utc);
        logging::info!(target: "serve", hour_utc, "In-process trial sweep scheduler enabled");
    }

    let router = server::create_app_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::config(format!("Failed to bind {}: {}", addr, e)))?;

    logging::info!(target: "serve", address = %addr, "API server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    Ok(())
}
