//! # DB-Backed Guard Helpers
//!
//! Thin wrappers that perform the single document lookup a team guard
//! needs, then evaluate the pure guards from the `auth` crate and map a
//! denial to a typed `Forbidden` error.

use auth::{guards, GuardDecision, Identity, TeamRef};
use entity::{team_members, teams};
use error::{AppError, Result};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

/// Convert a guard decision into a handler result.
pub fn enforce(decision: GuardDecision) -> Result<()> {
    match decision {
        GuardDecision::Allow => Ok(()),
        GuardDecision::Deny(reason) => Err(AppError::forbidden(reason)),
    }
}

/// Load the team snapshot the team guards evaluate against.
///
/// One team lookup plus the member list; soft-deleted teams are reported
/// as absent.
pub async fn load_team_ref(db: &sea_orm::DbConn, team_id: &str) -> Result<(teams::Model, TeamRef)> {
    let team = teams::Entity::find_by_id(team_id)
        .one(db)
        .await?
        .filter(|team| team.deleted_at.is_none())
        .ok_or_else(|| AppError::not_found("Team not found"))?;

    let member_ids = team_members::Entity::find()
        .filter(team_members::Column::TeamId.eq(team_id))
        .all(db)
        .await?
        .into_iter()
        .map(|member| member.user_id)
        .collect();

    let team_ref = TeamRef {
        id: team.id.clone(),
        organization_id: team.organization_id.clone(),
        manager_id: team.manager_id.clone(),
        member_ids,
    };

    Ok((team, team_ref))
}

/// Load a team and require manage access on it.
pub async fn require_team_manage(
    db: &sea_orm::DbConn,
    identity: &Identity,
    team_id: &str,
) -> Result<teams::Model> {
    let (team, team_ref) = load_team_ref(db, team_id).await?;
    enforce(guards::can_manage_team(identity, &team_ref))?;
    Ok(team)
}

/// Load a team and require view access on it.
pub async fn require_team_view(
    db: &sea_orm::DbConn,
    identity: &Identity,
    team_id: &str,
) -> Result<teams::Model> {
    let (team, team_ref) = load_team_ref(db, team_id).await?;
    enforce(guards::can_view_team(identity, &team_ref))?;
    Ok(team)
}

/// Require access to an explicit `:organization_id` route parameter.
///
/// Runs before any resource load so a denied request never fetches another
/// tenant's data.
pub fn require_organization_access(identity: &Identity, target_organization_id: &str) -> Result<()> {
    enforce(guards::can_access_organization(identity, target_organization_id))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use entity::users::UserRole;

    use super::*;

    #[test]
    fn test_enforce_maps_denial_to_forbidden() {
        let err = enforce(GuardDecision::Deny("cross-org: nope".to_string())).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
        assert!(err.message().contains("cross-org"));

        assert!(enforce(GuardDecision::Allow).is_ok());
    }

    #[test]
    fn test_require_organization_access_param_guard() {
        let identity = Identity {
            id:               "usr_1".to_string(),
            email:            "u@example.com".to_string(),
            role:             UserRole::OrgAdmin,
            organization_id:  Some("org_mine".to_string()),
            managed_team_ids: HashSet::new(),
        };

        assert!(require_organization_access(&identity, "org_mine").is_ok());

        let err = require_organization_access(&identity, "org_other").unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
        assert!(err.message().contains("cross-org"));
    }
}
