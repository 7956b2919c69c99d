//! # Database Migrations
//!
//! Sea-ORM migrations for the Meridian schema. Migrations are executed in
//! the order they appear in [`Migrator::migrations`].

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users_table;
mod m20260301_000002_create_organizations_table;
mod m20260301_000003_create_teams_table;
mod m20260301_000004_create_team_members_table;
mod m20260301_000005_create_team_managers_table;
mod m20260301_000006_create_invitations_table;
mod m20260301_000007_create_refresh_tokens_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users_table::Migration),
            Box::new(m20260301_000002_create_organizations_table::Migration),
            Box::new(m20260301_000003_create_teams_table::Migration),
            Box::new(m20260301_000004_create_team_members_table::Migration),
            Box::new(m20260301_000005_create_team_managers_table::Migration),
            Box::new(m20260301_000006_create_invitations_table::Migration),
            Box::new(m20260301_000007_create_refresh_tokens_table::Migration),
        ]
    }
}

/// Database connection helper for CLI usage
pub async fn connect_to_database(database_url: &str) -> Result<sea_orm::DatabaseConnection, sea_orm::DbErr> {
    sea_orm::Database::connect(database_url).await
}
