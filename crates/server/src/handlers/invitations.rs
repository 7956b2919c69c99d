//! # Invitation Handlers
//!
//! Token-bound offers to join an organization. Acceptance is public,
//! consumes the invitation exactly once, assigns the invited role, and
//! reserves a user slot under the inviter organization's plan before the
//! user record is written. The expiry check compares `expires_at` against
//! the clock; the stored status alone is never trusted.

use auth::{
    guards,
    hash_password,
    rbac::{InvitationAction, Permission},
    secrecy::{ExposeSecret, SecretString},
    validate_password_strength,
    Identity,
};
use axum::Json;
use chrono::{Duration, Utc};
use entity::{
    invitations::{self, InvitationStatus},
    organizations,
    team_members::{self, TeamMemberRole},
    users::{self, UserRole},
};
use error::{ApiResponse, AppError, PaginationMeta, Result};
use permissions_macro::with_permission;
use sea_orm::{
    ActiveModelTrait,
    ColumnTrait,
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
        invitations::{AcceptInvitationRequest, CreateInvitationRequest, InvitationResponse},
        users::UserResponse,
        ListQuery,
    },
    gate,
    ids,
    middleware::tenant::TenantContext,
    AppState,
};

/// Invitations are valid for 7 days.
const INVITATION_DAYS: i64 = 7;

/// Invite someone into the caller's organization.
#[with_permission(Permission::Invitations(InvitationAction::Create))]
pub async fn create_invitation_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    req: CreateInvitationRequest,
) -> Result<Json<ApiResponse<InvitationResponse>>> {
    req.validate()?;
    crate::guards::enforce(guards::can_invite_members(&identity))?;

    let org = gate::require_feature_access(state, &identity).await?;

    let role = parse_invited_role(&req.role)?;

    let existing_user = users::Entity::find()
        .filter(users::Column::Email.eq(&req.email))
        .filter(users::Column::DeletedAt.is_null())
        .one(&state.db)
        .await?;
    if existing_user.is_some() {
        return Err(AppError::conflict("A user with this email already exists"));
    }

    let pending = invitations::Entity::find()
        .filter(invitations::Column::OrganizationId.eq(tenant.organization_id()))
        .filter(invitations::Column::Email.eq(&req.email))
        .filter(invitations::Column::Status.eq(InvitationStatus::Pending))
        .one(&state.db)
        .await?;
    if let Some(pending) = pending {
        if pending.is_consumable(Utc::now()) {
            return Err(AppError::conflict(
                "A pending invitation already exists for this email",
            ));
        }
    }

    if let Some(ref team_id) = req.team_id {
        // The team must exist inside the inviter's organization.
        crate::guards::load_team_ref(&state.db, team_id)
            .await
            .ok()
            .filter(|(team, _)| team.organization_id.as_str() == tenant.organization_id())
            .ok_or_else(|| AppError::not_found("Team not found"))?;
    }

    let now = Utc::now();
    let token = crate::refresh_tokens::generate_refresh_token();

    let invitation = invitations::ActiveModel {
        id: Set(ids::invitation_id()),
        organization_id: Set(tenant.organization_id().to_string()),
        team_id: Set(req.team_id),
        email: Set(req.email.clone()),
        role: Set(role),
        token: Set(token.clone()),
        status: Set(InvitationStatus::Pending),
        invited_by: Set(identity.id.clone()),
        expires_at: Set(now + Duration::days(INVITATION_DAYS)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = invitation.insert(&state.db).await?;

    // Fire-and-forget; a failed send never fails the invitation.
    state.mailer.send_invitation(&req.email, &org.name, &token);

    info!(
        invitation_id = %created.id,
        organization_id = %tenant.organization_id(),
        invited_by = %identity.id,
        "Invitation created"
    );

    Ok(Json(ApiResponse::ok(
        "Invitation created",
        InvitationResponse::from_model(&created),
    )))
}

/// List the caller organization's invitations.
#[with_permission(Permission::Invitations(InvitationAction::Read))]
pub async fn list_invitations_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    query: ListQuery,
) -> Result<Json<ApiResponse<Vec<InvitationResponse>>>> {
    let page = query.page();
    let per_page = query.per_page();

    let base_query = invitations::Entity::find()
        .filter(invitations::Column::OrganizationId.eq(tenant.organization_id()));

    let total = base_query.clone().count(&state.db).await?;

    let page_models = base_query
        .order_by_desc(invitations::Column::CreatedAt)
        .paginate(&state.db, per_page)
        .fetch_page(page.saturating_sub(1))
        .await?;

    // Expiry is evaluated at read time; present stale pending rows as
    // expired without rewriting them.
    let now = Utc::now();
    let data: Vec<InvitationResponse> = page_models
        .iter()
        .map(|invitation| {
            let mut response = InvitationResponse::from_model(invitation);
            if invitation.status == InvitationStatus::Pending && invitation.expires_at <= now {
                response.status = InvitationStatus::Expired.to_string();
            }
            response
        })
        .collect();

    Ok(Json(ApiResponse::paginated(
        "Invitations retrieved",
        data,
        PaginationMeta::new(page, per_page, total),
    )))
}

/// Revoke a pending invitation.
#[with_permission(Permission::Invitations(InvitationAction::Revoke))]
pub async fn revoke_invitation_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    invitation_id: &str,
) -> Result<Json<ApiResponse<InvitationResponse>>> {
    // Platform admins or anyone who could have issued the invitation may
    // take it back; the last denial is the one surfaced.
    crate::guards::enforce(auth::any_of(&[
        auth::guards::platform_admin(&identity),
        auth::guards::can_invite_members(&identity),
    ]))?;

    let invitation = invitations::Entity::find_by_id(invitation_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Invitation not found"))?;

    if !identity.is_platform_admin() &&
        invitation.organization_id.as_str() != tenant.organization_id()
    {
        return Err(AppError::forbidden(
            "cross-org: invitation belongs to a different organization",
        ));
    }

    if invitation.status != InvitationStatus::Pending {
        return Err(AppError::bad_request(
            "Only pending invitations can be revoked",
        ));
    }

    let mut active: invitations::ActiveModel = invitation.into();
    active.status = Set(InvitationStatus::Revoked);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    info!(invitation_id = %invitation_id, user_id = %identity.id, "Invitation revoked");

    Ok(Json(ApiResponse::ok(
        "Invitation revoked",
        InvitationResponse::from_model(&updated),
    )))
}

/// Accept an invitation (public, token-based).
///
/// Consumed exactly once: the pending→accepted transition is conditioned
/// on the current status, the expiry is checked against the clock even
/// when the stored status is still pending, and the created user receives
/// the invitation's role.
pub async fn accept_invitation_handler(
    state: &AppState,
    req: AcceptInvitationRequest,
) -> Result<Json<ApiResponse<UserResponse>>> {
    req.validate()?;

    if let Err(errors) = validate_password_strength(&req.password) {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(AppError::validation(messages.join(", ")));
    }

    let invitation = invitations::Entity::find()
        .filter(invitations::Column::Token.eq(&req.token))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid or expired invitation"))?;

    let now = Utc::now();
    if !invitation.is_consumable(now) {
        // Mark stale pending rows as expired on the way out.
        if invitation.status == InvitationStatus::Pending {
            let mut active: invitations::ActiveModel = invitation.into();
            active.status = Set(InvitationStatus::Expired);
            active.updated_at = Set(now);
            active.update(&state.db).await?;
        }
        return Err(AppError::bad_request("Invalid or expired invitation"));
    }

    let existing_user = users::Entity::find()
        .filter(users::Column::Email.eq(&invitation.email))
        .filter(users::Column::DeletedAt.is_null())
        .one(&state.db)
        .await?;
    if existing_user.is_some() {
        return Err(AppError::conflict("A user with this email already exists"));
    }

    let org = gate::load_organization(&state.db, &invitation.organization_id).await?;

    let password_secret = SecretString::from(req.password);
    let password_hash = hash_password(&password_secret)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))?;

    // Quota check: the new member must fit under the plan ceiling.
    gate::reserve_user_slot(&state.db, &org).await?;

    let user = users::ActiveModel {
        id: Set(ids::user_id()),
        email: Set(invitation.email.clone()),
        password_hash: Set(password_hash.expose_secret().to_string()),
        first_name: Set(req.first_name),
        last_name: Set(req.last_name),
        role: Set(invitation.role),
        organization_id: Set(Some(invitation.organization_id.clone())),
        is_active: Set(true),
        must_change_password: Set(false),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    let created = match user.insert(&state.db).await {
        Ok(created) => created,
        Err(e) => {
            gate::release_user_slot(&state.db, &invitation.organization_id).await?;
            return Err(e.into());
        },
    };

    // Consume the invitation: only a still-pending row transitions, so a
    // racing second accept finds nothing to update.
    let consumed = invitations::Entity::update_many()
        .set(invitations::ActiveModel {
            status: Set(InvitationStatus::Accepted),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(invitations::Column::Id.eq(&invitation.id))
        .filter(invitations::Column::Status.eq(InvitationStatus::Pending))
        .exec(&state.db)
        .await?;

    if consumed.rows_affected == 0 {
        return Err(AppError::conflict("Invitation has already been used"));
    }

    // Admin-initiated setup: the accepted owner claims the organization.
    if invitation.role == UserRole::OrgOwner && org.owner_id.is_empty() {
        let mut active: organizations::ActiveModel = org.into();
        active.owner_id = Set(created.id.clone());
        active.updated_at = Set(now);
        active.update(&state.db).await?;
    }

    // Optional team placement from the invitation.
    if let Some(ref team_id) = invitation.team_id {
        let member = team_members::ActiveModel {
            id: Set(ids::team_member_id()),
            team_id: Set(team_id.clone()),
            user_id: Set(created.id.clone()),
            role: Set(TeamMemberRole::Member),
            joined_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        };
        if let Err(e) = member.insert(&state.db).await {
            // Membership is best-effort; the account itself is created.
            tracing::warn!(team_id = %team_id, user_id = %created.id, error = %e, "Failed to add invited user to team");
        }
    }

    info!(
        user_id = %created.id,
        organization_id = %invitation.organization_id,
        invitation_id = %invitation.id,
        "Invitation accepted"
    );

    Ok(Json(ApiResponse::ok(
        "Invitation accepted",
        UserResponse::from_model(&created),
    )))
}

/// Parse the role an invited user will receive.
fn parse_invited_role(role: &str) -> Result<UserRole> {
    match UserRole::from_string(role) {
        Some(role @ (UserRole::OrgOwner | UserRole::OrgAdmin | UserRole::OrgMember)) => Ok(role),
        Some(_) => {
            Err(AppError::bad_request(
                "Platform roles cannot be granted by invitation",
            ))
        },
        None => {
            Err(AppError::bad_request(
                "Invalid role. Must be one of: org_owner, org_admin, org_member",
            ))
        },
    }
}
