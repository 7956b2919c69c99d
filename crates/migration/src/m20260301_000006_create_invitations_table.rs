use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invitations::Table)
                    .if_not_exists()
                    .col(text(Invitations::Id).not_null().primary_key())
                    .col(text(Invitations::OrganizationId).not_null())
                    .col(text_null(Invitations::TeamId))
                    .col(string(Invitations::Email).not_null())
                    .col(string(Invitations::Role).not_null().default("org_member"))
                    .col(text(Invitations::Token).not_null().unique_key())
                    .col(string(Invitations::Status).not_null().default("pending"))
                    .col(text(Invitations::InvitedBy).not_null())
                    .col(timestamp_with_time_zone(Invitations::ExpiresAt).not_null())
                    .col(
                        timestamp_with_time_zone(Invitations::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Invitations::UpdatedAt)
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
                    .name("idx_invitations_organization_id")
                    .table(Invitations::Table)
                    .col(Invitations::OrganizationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_invitations_email")
                    .table(Invitations::Table)
                    .col(Invitations::Email)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Invitations::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Invitations {
    Table,
    Id,
    OrganizationId,
    TeamId,
    Email,
    Role,
    Token,
    Status,
    InvitedBy,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}
