//! # Team Handlers
//!
//! Team CRUD, membership management and the two-stage approval flow.
//! Creation passes the subscription gate and reserves a team slot under
//! the plan ceiling before anything is written.

use auth::{
    rbac::{Permission, TeamAction},
    Identity,
};
use axum::Json;
use chrono::Utc;
use entity::{
    team_members::{self, TeamMemberRole},
    teams::{self, ApprovalState},
    users,
};
use error::{ApiResponse, AppError, PaginationMeta, Result};
use permissions_macro::with_permission;
use sea_orm::{
    ActiveModelTrait,
    ColumnTrait,
    Condition,
    EntityTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
    Set,
};
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        teams::{
            AddTeamMemberRequest,
            BulkDeleteTeamsRequest,
            BulkDeleteTeamsResponse,
            CreateTeamRequest,
            TeamMemberResponse,
            TeamResponse,
            UpdateTeamApprovalRequest,
            UpdateTeamRequest,
        },
        ListQuery,
    },
    gate,
    guards::{require_team_manage, require_team_view},
    ids,
    middleware::tenant::TenantContext,
    utils::{escape_like_wildcards, slugify},
    AppState,
};

/// Create a new team in the caller's organization.
#[with_permission(Permission::Teams(TeamAction::Create))]
pub async fn create_team_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    req: CreateTeamRequest,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    req.validate()?;

    let org = gate::require_feature_access(state, &identity).await?;

    let slug = slugify(&req.name);
    let existing = teams::Entity::find()
        .filter(teams::Column::OrganizationId.eq(tenant.organization_id()))
        .filter(teams::Column::Slug.eq(&slug))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("A team with this name already exists"));
    }

    let manager_id = req.manager_id.unwrap_or_else(|| identity.id.clone());
    let manager = users::Entity::find_by_id(&manager_id)
        .one(&state.db)
        .await?
        .filter(|u| u.deleted_at.is_none())
        .ok_or_else(|| AppError::not_found("Manager user not found"))?;
    if manager.organization_id.as_deref() != Some(tenant.organization_id()) {
        return Err(AppError::forbidden(
            "cross-org: manager belongs to a different organization",
        ));
    }

    // Quota check happens here, before any write of the team itself.
    gate::reserve_team_slot(&state.db, &org).await?;

    let now = Utc::now();
    let team = teams::ActiveModel {
        id: Set(ids::team_id()),
        organization_id: Set(tenant.organization_id().to_string()),
        name: Set(req.name.clone()),
        slug: Set(slug),
        description: Set(req.description),
        manager_id: Set(manager_id.clone()),
        manager_approved: Set(ApprovalState::Pending),
        director_approved: Set(ApprovalState::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    let created = match team.insert(&state.db).await {
        Ok(created) => created,
        Err(e) => {
            gate::release_team_slot(&state.db, tenant.organization_id()).await?;
            return Err(e.into());
        },
    };

    // The manager joins the member list as lead.
    let member = team_members::ActiveModel {
        id: Set(ids::team_member_id()),
        team_id: Set(created.id.clone()),
        user_id: Set(manager_id),
        role: Set(TeamMemberRole::Lead),
        joined_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
    };
    member.insert(&state.db).await?;

    info!(team_id = %created.id, user_id = %identity.id, "Team created");

    Ok(Json(ApiResponse::ok(
        "Team created",
        TeamResponse::from_model(&created, Some(1)),
    )))
}

/// Get a single team by ID.
pub async fn get_team_handler(
    state: &AppState,
    identity: Identity,
    team_id: &str,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    let team = require_team_view(&state.db, &identity, team_id).await?;

    let member_count = team_members::Entity::find()
        .filter(team_members::Column::TeamId.eq(team_id))
        .count(&state.db)
        .await
        .unwrap_or(0);

    Ok(Json(ApiResponse::ok(
        "Team retrieved",
        TeamResponse::from_model(&team, Some(member_count)),
    )))
}

/// List the caller organization's teams with pagination and search.
#[with_permission(Permission::Teams(TeamAction::Read))]
pub async fn list_teams_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    query: ListQuery,
) -> Result<Json<ApiResponse<Vec<TeamResponse>>>> {
    let page = query.page();
    let per_page = query.per_page();

    let mut base_query = teams::Entity::find()
        .filter(teams::Column::OrganizationId.eq(tenant.organization_id()))
        .filter(teams::Column::DeletedAt.is_null());

    if let Some(ref search) = query.search {
        let pattern = format!("%{}%", escape_like_wildcards(search));
        base_query = base_query.filter(
            Condition::any()
                .add(teams::Column::Name.like(&pattern))
                .add(teams::Column::Slug.like(&pattern)),
        );
    }

    let total = base_query.clone().count(&state.db).await?;

    let page_models = base_query
        .order_by_asc(teams::Column::Name)
        .paginate(&state.db, per_page)
        .fetch_page(page.saturating_sub(1))
        .await?;

    let data: Vec<TeamResponse> = page_models
        .iter()
        .map(|t| TeamResponse::from_model(t, None))
        .collect();

    Ok(Json(ApiResponse::paginated(
        "Teams retrieved",
        data,
        PaginationMeta::new(page, per_page, total),
    )))
}

/// Update a team's name, description or manager.
pub async fn update_team_handler(
    state: &AppState,
    identity: Identity,
    team_id: &str,
    req: UpdateTeamRequest,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    req.validate()?;

    let team = require_team_manage(&state.db, &identity, team_id).await?;
    let organization_id = team.organization_id.clone();

    let mut active: teams::ActiveModel = team.into();

    if let Some(name) = req.name {
        let new_slug = slugify(&name);
        let existing = teams::Entity::find()
            .filter(teams::Column::OrganizationId.eq(organization_id.as_str()))
            .filter(teams::Column::Slug.eq(&new_slug))
            .filter(teams::Column::Id.ne(team_id))
            .one(&state.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::conflict("A team with this name already exists"));
        }
        active.name = Set(name);
        active.slug = Set(new_slug);
    }
    if let Some(description) = req.description {
        active.description = Set(Some(description));
    }
    if let Some(manager_id) = req.manager_id {
        let manager = users::Entity::find_by_id(&manager_id)
            .one(&state.db)
            .await?
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(|| AppError::not_found("New manager user not found"))?;
        if manager.organization_id.as_deref() != Some(organization_id.as_str()) {
            return Err(AppError::forbidden(
                "cross-org: manager belongs to a different organization",
            ));
        }
        active.manager_id = Set(manager_id);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;

    info!(team_id = %team_id, user_id = %identity.id, "Team updated");

    Ok(Json(ApiResponse::ok(
        "Team updated",
        TeamResponse::from_model(&updated, None),
    )))
}

/// Update the tri-state approvals on a team.
pub async fn update_team_approval_handler(
    state: &AppState,
    identity: Identity,
    team_id: &str,
    req: UpdateTeamApprovalRequest,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    let team = require_team_manage(&state.db, &identity, team_id).await?;

    let mut active: teams::ActiveModel = team.into();

    if let Some(ref value) = req.manager_approved {
        active.manager_approved = Set(parse_approval(value)?);
    }
    if let Some(ref value) = req.director_approved {
        active.director_approved = Set(parse_approval(value)?);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;

    info!(
        team_id = %team_id,
        manager_approved = %updated.manager_approved,
        director_approved = %updated.director_approved,
        user_id = %identity.id,
        "Team approval updated"
    );

    Ok(Json(ApiResponse::ok(
        "Team approval updated",
        TeamResponse::from_model(&updated, None),
    )))
}

/// Soft-delete a team and release its plan slot.
pub async fn delete_team_handler(
    state: &AppState,
    identity: Identity,
    team_id: &str,
) -> Result<Json<ApiResponse<()>>> {
    let team = require_team_manage(&state.db, &identity, team_id).await?;
    let organization_id = team.organization_id.clone();

    let now = Utc::now();
    let mut active: teams::ActiveModel = team.into();
    active.deleted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(&state.db).await?;

    gate::release_team_slot(&state.db, &organization_id).await?;

    info!(team_id = %team_id, user_id = %identity.id, "Team soft-deleted");

    Ok(Json(ApiResponse::message("Team deleted")))
}

/// Delete several teams; teams the caller cannot manage are skipped.
pub async fn bulk_delete_teams_handler(
    state: &AppState,
    identity: Identity,
    req: BulkDeleteTeamsRequest,
) -> Result<Json<ApiResponse<BulkDeleteTeamsResponse>>> {
    req.validate()?;

    let mut deleted = Vec::new();
    let mut skipped = Vec::new();

    for team_id in &req.team_ids {
        match delete_team_handler(state, identity.clone(), team_id).await {
            Ok(_) => deleted.push(team_id.clone()),
            Err(e) => {
                info!(team_id = %team_id, error = %e, "Bulk delete skipped team");
                skipped.push(team_id.clone());
            },
        }
    }

    Ok(Json(ApiResponse::ok(
        "Bulk delete finished",
        BulkDeleteTeamsResponse {
            deleted,
            skipped,
        },
    )))
}

/// Add a member to a team.
pub async fn add_team_member_handler(
    state: &AppState,
    identity: Identity,
    team_id: &str,
    req: AddTeamMemberRequest,
) -> Result<Json<ApiResponse<TeamMemberResponse>>> {
    req.validate()?;

    let team = require_team_manage(&state.db, &identity, team_id).await?;

    let target_user = users::Entity::find_by_id(&req.user_id)
        .one(&state.db)
        .await?
        .filter(|u| u.deleted_at.is_none())
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if target_user.organization_id.as_deref() != Some(team.organization_id.as_str()) {
        return Err(AppError::forbidden(
            "cross-org: user belongs to a different organization",
        ));
    }

    let role = parse_team_member_role(&req.role)?;

    let existing = team_members::Entity::find()
        .filter(team_members::Column::TeamId.eq(team_id))
        .filter(team_members::Column::UserId.eq(&req.user_id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("User is already a member of this team"));
    }

    let now = Utc::now();
    let member = team_members::ActiveModel {
        id: Set(ids::team_member_id()),
        team_id: Set(team_id.to_string()),
        user_id: Set(req.user_id.clone()),
        role: Set(role),
        joined_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = member.insert(&state.db).await?;

    info!(team_id = %team_id, target_user_id = %req.user_id, user_id = %identity.id, "Team member added");

    Ok(Json(ApiResponse::ok(
        "Team member added",
        TeamMemberResponse {
            id:           created.id,
            user_id:      created.user_id,
            email:        target_user.email.clone(),
            display_name: member_display_name(&target_user),
            role:         created.role.to_string(),
            joined_at:    created.joined_at.to_rfc3339(),
        },
    )))
}

/// Remove a member from a team.
pub async fn remove_team_member_handler(
    state: &AppState,
    identity: Identity,
    team_id: &str,
    member_id: &str,
) -> Result<Json<ApiResponse<()>>> {
    require_team_manage(&state.db, &identity, team_id).await?;

    let member = team_members::Entity::find_by_id(member_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Team member not found"))?;

    if member.team_id != team_id {
        return Err(AppError::not_found("Team member not found in this team"));
    }

    team_members::Entity::delete_by_id(member_id)
        .exec(&state.db)
        .await?;

    info!(team_id = %team_id, member_id = %member_id, user_id = %identity.id, "Team member removed");

    Ok(Json(ApiResponse::message("Team member removed")))
}

/// List the members of a team.
pub async fn list_team_members_handler(
    state: &AppState,
    identity: Identity,
    team_id: &str,
) -> Result<Json<ApiResponse<Vec<TeamMemberResponse>>>> {
    require_team_view(&state.db, &identity, team_id).await?;

    let members = team_members::Entity::find()
        .filter(team_members::Column::TeamId.eq(team_id))
        .find_also_related(users::Entity)
        .all(&state.db)
        .await?;

    let data: Vec<TeamMemberResponse> = members
        .into_iter()
        .map(|(member, user_opt)| {
            let (email, display_name) = match user_opt {
                Some(user) => {
                    let name = member_display_name(&user);
                    (user.email, name)
                },
                None => ("unknown".to_string(), "Unknown User".to_string()),
            };
            TeamMemberResponse {
                id: member.id,
                user_id: member.user_id,
                email,
                display_name,
                role: member.role.to_string(),
                joined_at: member.joined_at.to_rfc3339(),
            }
        })
        .collect();

    Ok(Json(ApiResponse::ok("Team members retrieved", data)))
}

fn member_display_name(user: &users::Model) -> String {
    let name = format!(
        "{} {}",
        user.first_name.clone().unwrap_or_default(),
        user.last_name.clone().unwrap_or_default()
    )
    .trim()
    .to_string();

    if name.is_empty() {
        user.email.clone()
    }
    else {
        name
    }
}

/// Parse a team member role string into the enum.
fn parse_team_member_role(role_str: &str) -> Result<TeamMemberRole> {
    TeamMemberRole::from_string(&role_str.to_lowercase()).ok_or_else(|| {
        AppError::bad_request("Invalid role. Must be one of: lead, member, viewer")
    })
}

/// Parse a tri-state approval value.
fn parse_approval(value: &str) -> Result<ApprovalState> {
    ApprovalState::from_string(&value.to_lowercase()).ok_or_else(|| {
        AppError::bad_request("Invalid approval state. Must be one of: pending, approved, rejected")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_team_member_role_valid() {
        assert_eq!(
            parse_team_member_role("lead").unwrap(),
            TeamMemberRole::Lead
        );
        assert_eq!(
            parse_team_member_role("MEMBER").unwrap(),
            TeamMemberRole::Member
        );
        assert_eq!(
            parse_team_member_role("viewer").unwrap(),
            TeamMemberRole::Viewer
        );
    }

    #[test]
    fn test_parse_team_member_role_invalid() {
        assert!(parse_team_member_role("owner").is_err());
        assert!(parse_team_member_role("").is_err());
    }

    #[test]
    fn test_parse_approval_valid() {
        assert_eq!(parse_approval("pending").unwrap(), ApprovalState::Pending);
        assert_eq!(parse_approval("Approved").unwrap(), ApprovalState::Approved);
        assert_eq!(parse_approval("rejected").unwrap(), ApprovalState::Rejected);
    }

    #[test]
    fn test_parse_approval_rejects_numeric_encodings() {
        assert!(parse_approval("2").is_err());
        assert!(parse_approval("-1").is_err());
    }
}
