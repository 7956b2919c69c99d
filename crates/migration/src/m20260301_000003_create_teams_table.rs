use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Teams::Table)
                    .if_not_exists()
                    .col(text(Teams::Id).not_null().primary_key())
                    .col(text(Teams::OrganizationId).not_null())
                    .col(string(Teams::Name).not_null())
                    .col(string(Teams::Slug).not_null())
                    .col(text_null(Teams::Description))
                    .col(text(Teams::ManagerId).not_null())
                    .col(small_integer(Teams::ManagerApproved).not_null().default(0))
                    .col(
                        small_integer(Teams::DirectorApproved)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        timestamp_with_time_zone(Teams::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Teams::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Teams::DeletedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_teams_organization_id")
                    .table(Teams::Table)
                    .col(Teams::OrganizationId)
                    .to_owned(),
            )
            .await?;

        // Slugs are unique per tenant, not globally.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_teams_organization_slug")
                    .table(Teams::Table)
                    .col(Teams::OrganizationId)
                    .col(Teams::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_teams_manager_id")
                    .table(Teams::Table)
                    .col(Teams::ManagerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Teams::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Teams {
    Table,
    Id,
    OrganizationId,
    Name,
    Slug,
    Description,
    ManagerId,
    ManagerApproved,
    DirectorApproved,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
