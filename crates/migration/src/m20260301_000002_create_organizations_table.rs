use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(text(Organizations::Id).not_null().primary_key())
                    .col(string(Organizations::Name).not_null())
                    .col(string(Organizations::Slug).not_null().unique_key())
                    .col(string(Organizations::Plan).not_null().default("free"))
                    .col(
                        string(Organizations::SubscriptionStatus)
                            .not_null()
                            .default("trialing"),
                    )
                    .col(timestamp_with_time_zone_null(Organizations::TrialEndsAt))
                    .col(text(Organizations::OwnerId).not_null())
                    .col(integer(Organizations::UserCount).not_null().default(0))
                    .col(integer(Organizations::TeamCount).not_null().default(0))
                    .col(text_null(Organizations::BillingCustomerId))
                    .col(text_null(Organizations::BillingSubscriptionId))
                    .col(
                        boolean(Organizations::CancelAtPeriodEnd)
                            .not_null()
                            .default(false),
                    )
                    .col(boolean(Organizations::IsActive).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Organizations::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Organizations::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Organizations::DeletedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_organizations_subscription_status")
                    .table(Organizations::Table)
                    .col(Organizations::SubscriptionStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_organizations_billing_customer_id")
                    .table(Organizations::Table)
                    .col(Organizations::BillingCustomerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Organizations {
    Table,
    Id,
    Name,
    Slug,
    Plan,
    SubscriptionStatus,
    TrialEndsAt,
    OwnerId,
    UserCount,
    TeamCount,
    BillingCustomerId,
    BillingSubscriptionId,
    CancelAtPeriodEnd,
    IsActive,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
