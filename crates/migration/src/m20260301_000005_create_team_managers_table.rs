use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TeamManagers::Table)
                    .if_not_exists()
                    .col(text(TeamManagers::Id).not_null().primary_key())
                    .col(text(TeamManagers::TeamId).not_null())
                    .col(text(TeamManagers::UserId).not_null())
                    .col(
                        timestamp_with_time_zone(TeamManagers::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_team_managers_team_user")
                    .table(TeamManagers::Table)
                    .col(TeamManagers::TeamId)
                    .col(TeamManagers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_team_managers_user_id")
                    .table(TeamManagers::Table)
                    .col(TeamManagers::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TeamManagers::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum TeamManagers {
    Table,
    Id,
    TeamId,
    UserId,
    CreatedAt,
}
