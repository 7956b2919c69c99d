//! # Subscription Gate and Quota Reservation
//!
//! The gate decides whether an organization currently has feature access;
//! quota reservation enforces plan ceilings on countable resources.
//!
//! Reservation is a single atomic conditional update
//! (`SET n = n + 1 WHERE n < max`), not a read-then-write pair, so two
//! concurrent creations cannot both slip past the ceiling. A failed
//! reservation rejects the operation before any entity is written; a
//! failed creation afterwards releases the slot.

use billing::{access, PlanLimits};
use chrono::Utc;
use entity::organizations::{self, SubscriptionStatus};
use error::{AppError, Result};
use sea_orm::{
    sea_query::Expr,
    ColumnTrait,
    EntityTrait,
    QueryFilter,
};
use auth::Identity;

use crate::AppState;

/// Load the caller's organization and require feature access on it.
///
/// Platform admins bypass the gate entirely; their role short-circuits
/// before the subscription predicate is evaluated.
pub async fn require_feature_access(
    state: &AppState,
    identity: &Identity,
) -> Result<organizations::Model> {
    let organization_id = identity
        .organization_id
        .as_deref()
        .ok_or_else(|| AppError::bad_request("User does not belong to an organization"))?;

    let org = load_organization(&state.db, organization_id).await?;

    if identity.is_platform_admin() {
        return Ok(org);
    }

    if access::can_access_features(&org, Utc::now()) {
        return Ok(org);
    }

    Err(match org.subscription_status {
        SubscriptionStatus::PastDue => AppError::payment_required("Subscription is past due"),
        SubscriptionStatus::Trialing => AppError::payment_required("Trial period has ended"),
        SubscriptionStatus::Incomplete => {
            AppError::payment_required("Subscription setup is incomplete")
        },
        SubscriptionStatus::Canceled => AppError::forbidden("Subscription has been canceled"),
        // unreachable: Active always has access
        SubscriptionStatus::Active => AppError::forbidden("Feature access denied"),
    })
}

/// Load an organization, treating soft-deleted ones as absent.
pub async fn load_organization(
    db: &sea_orm::DbConn,
    organization_id: &str,
) -> Result<organizations::Model> {
    organizations::Entity::find_by_id(organization_id)
        .one(db)
        .await?
        .filter(|org| org.deleted_at.is_none())
        .ok_or_else(|| AppError::not_found("Organization not found"))
}

/// Reserve a user slot under the organization's plan ceiling.
///
/// Zero rows affected means the quota is exhausted; the creation must be
/// rejected without writing anything.
pub async fn reserve_user_slot(db: &sea_orm::DbConn, org: &organizations::Model) -> Result<()> {
    let limits = PlanLimits::for_plan(org.plan);

    let result = organizations::Entity::update_many()
        .col_expr(
            organizations::Column::UserCount,
            Expr::col(organizations::Column::UserCount).add(1),
        )
        .col_expr(
            organizations::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(organizations::Column::Id.eq(&org.id))
        .filter(organizations::Column::UserCount.lt(limits.max_users))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::forbidden(format!(
            "Plan limit reached: the {} plan allows at most {} users",
            org.plan, limits.max_users
        )));
    }

    Ok(())
}

/// Reserve a team slot under the organization's plan ceiling.
pub async fn reserve_team_slot(db: &sea_orm::DbConn, org: &organizations::Model) -> Result<()> {
    let limits = PlanLimits::for_plan(org.plan);

    let result = organizations::Entity::update_many()
        .col_expr(
            organizations::Column::TeamCount,
            Expr::col(organizations::Column::TeamCount).add(1),
        )
        .col_expr(
            organizations::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(organizations::Column::Id.eq(&org.id))
        .filter(organizations::Column::TeamCount.lt(limits.max_teams))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::forbidden(format!(
            "Plan limit reached: the {} plan allows at most {} teams",
            org.plan, limits.max_teams
        )));
    }

    Ok(())
}

/// Release a user slot (floor zero) after a deletion or a failed create.
pub async fn release_user_slot(db: &sea_orm::DbConn, organization_id: &str) -> Result<()> {
    organizations::Entity::update_many()
        .col_expr(
            organizations::Column::UserCount,
            Expr::col(organizations::Column::UserCount).sub(1),
        )
        .filter(organizations::Column::Id.eq(organization_id))
        .filter(organizations::Column::UserCount.gt(0))
        .exec(db)
        .await?;

    Ok(())
}

/// Release a team slot (floor zero) after a deletion or a failed create.
pub async fn release_team_slot(db: &sea_orm::DbConn, organization_id: &str) -> Result<()> {
    organizations::Entity::update_many()
        .col_expr(
            organizations::Column::TeamCount,
            Expr::col(organizations::Column::TeamCount).sub(1),
        )
        .filter(organizations::Column::Id.eq(organization_id))
        .filter(organizations::Column::TeamCount.gt(0))
        .exec(db)
        .await?;

    Ok(())
}
