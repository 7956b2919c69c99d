//! # Meridian CLI
//!
//! Command-line interface for the Meridian platform.
//!
//! ## Usage
//!
//! ```bash
//! meridian serve              # Start the API server (runs migrations automatically)
//! meridian migrate            # Run database migrations
//! meridian sweep              # Run the trial-expiry sweep once and exit
//! meridian validate           # Verify configuration
//! meridian --help             # Show help
//! ```

use clap::{Args, CommandFactory as _, Parser, Subcommand};
use error::Result;

mod bootstrap;
mod config;

/// Meridian - multi-tenant platform backend
#[derive(Parser, Debug)]
#[command(name = "meridian")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (debug, info, warn, error)
    #[arg(short = 'L', long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// Output format (json, pretty, compact)
    #[arg(short, long, env = "MERIDIAN_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the API server
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Run the trial-expiry sweep once and exit
    ///
    /// Multi-replica deployments should run this from a single job runner
    /// instead of enabling the in-process scheduler.
    Sweep,

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Verify configuration
    Validate,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Server host to bind to
    #[arg(long, env = "MERIDIAN_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Server port to bind to
    #[arg(short, long, env = "MERIDIAN_PORT", default_value = "3000")]
    port: u16,

    /// Enable the in-process daily trial sweep (single instance only)
    #[arg(long, env = "MERIDIAN_WITH_SCHEDULER")]
    with_scheduler: bool,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Rollback the last migration instead of applying pending ones
    #[arg(long)]
    rollback: bool,
}

#[derive(Args, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: clap_complete::Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level, &cli.log_format, None)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match cli.command {
        Commands::Serve(args) => serve(&args).await?,
        Commands::Migrate(args) => migrate(&args).await?,
        Commands::Sweep => sweep().await?,
        Commands::Completions(args) => completions(&args)?,
        Commands::Validate => validate()?,
    }

    Ok(())
}

async fn serve(args: &ServeArgs) -> Result<()> {
    logging::info!(target: "serve",
        host = %args.host,
        port = %args.port,
        with_scheduler = %args.with_scheduler,
        "Starting API server..."
    );

    let state = bootstrap::build_state().await?;

    logging::info!(target: "serve", "Running database migrations...");
    bootstrap::run_migrations(&state).await?;
    logging::info!(target: "serve", "Database migrations completed");

    bootstrap::serve(state, &args.host, args.port, args.with_scheduler).await
}

async fn migrate(args: &MigrateArgs) -> Result<()> {
    use migration::MigratorTrait;

    let database_url = config::database_url().map_err(|e| error::AppError::config(e.to_string()))?;
    let db = migration::connect_to_database(&database_url)
        .await
        .map_err(|e| error::AppError::config(format!("Failed to connect to database: {}", e)))?;

    if args.rollback {
        logging::info!(target: "migrate", "Rolling back the last migration...");
        migration::Migrator::down(&db, None)
            .await
            .map_err(|e| error::AppError::migration(e.to_string()))?;
        logging::info!(target: "migrate", "Rollback completed");
        return Ok(());
    }

    logging::info!(target: "migrate", "Running database migrations...");
    migration::Migrator::up(&db, None)
        .await
        .map_err(|e| error::AppError::migration(e.to_string()))?;
    logging::info!(target: "migrate", "Migrations completed");

    Ok(())
}

async fn sweep() -> Result<()> {
    let state = bootstrap::build_state().await?;

    let stats = server::sweep::run_trial_sweep(&state).await?;

    logging::info!(target: "sweep",
        checked = stats.checked,
        transitioned = stats.transitioned,
        warnings = stats.warnings,
        errors = stats.errors,
        "Trial sweep completed"
    );

    if stats.errors > 0 {
        return Err(error::AppError::internal(format!(
            "Trial sweep finished with {} per-organization errors",
            stats.errors
        )));
    }

    Ok(())
}

fn completions(args: &CompletionsArgs) -> Result<()> {
    clap_complete::generate(
        args.shell,
        &mut Cli::command(),
        "meridian",
        &mut std::io::stdout(),
    );
    Ok(())
}

fn validate() -> Result<()> {
    logging::info!(target: "validate", "Validating configuration...");

    let mut failures = Vec::new();

    match config::database_url() {
        Ok(_) => logging::info!(target: "validate", "Database configuration OK"),
        Err(e) => failures.push(format!("database: {}", e)),
    }

    match auth::JwtConfig::from_env() {
        Ok(_) => logging::info!(target: "validate", "JWT configuration OK"),
        Err(e) => failures.push(format!("jwt: {}", e)),
    }

    let redis_url =
        std::env::var("MERIDIAN_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    match redis::Client::open(redis_url) {
        Ok(_) => logging::info!(target: "validate", "Redis configuration OK"),
        Err(e) => failures.push(format!("redis: {}", e)),
    }

    match billing::BillingConfig::from_env() {
        Ok(_) => logging::info!(target: "validate", "Billing configuration OK"),
        Err(e) => {
            logging::warn!(target: "validate", error = %e, "Billing not configured (development defaults will be used)")
        },
    }

    if failures.is_empty() {
        logging::info!(target: "validate", "Configuration is valid");
        Ok(())
    }
    else {
        Err(error::AppError::config(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_parse_serve() {
        let cli = Cli::parse_from(["meridian", "serve", "--host", "127.0.0.1", "--port", "8080"]);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.host, "127.0.0.1");
                assert_eq!(args.port, 8080);
                assert!(!args.with_scheduler);
            },
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_scheduler() {
        let cli = Cli::parse_from(["meridian", "serve", "--with-scheduler"]);
        match cli.command {
            Commands::Serve(args) => assert!(args.with_scheduler),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_sweep() {
        let cli = Cli::parse_from(["meridian", "sweep"]);
        assert!(matches!(cli.command, Commands::Sweep));
    }

    #[test]
    fn test_cli_parse_migrate_rollback() {
        let cli = Cli::parse_from(["meridian", "migrate", "--rollback"]);
        match cli.command {
            Commands::Migrate(args) => assert!(args.rollback),
            _ => panic!("Expected Migrate command"),
        }
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["meridian", "validate"]);
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.log_format, "pretty");
    }

    #[test]
    fn test_cli_command_factory() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "meridian");
    }
}
