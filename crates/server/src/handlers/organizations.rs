//! # Organization Handlers
//!
//! Tenant management. Reads go through the Redis snapshot cache
//! (read-through with a short TTL); every mutation invalidates the
//! snapshot. Routes carrying an explicit `:organization_id` parameter run
//! the cross-tenant access guard before anything is loaded.

use auth::{
    guards,
    rbac::{OrganizationAction, Permission},
    Identity,
};
use axum::Json;
use chrono::Utc;
use entity::organizations::{self, Plan, SubscriptionStatus};
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
    cache::{organization_key, Cache},
    dto::{
        organizations::{
            ChangePlanRequest,
            CreateOrganizationRequest,
            OrganizationResponse,
            OrganizationSetupResponse,
            UpdateOrganizationRequest,
        },
        ListQuery,
    },
    gate,
    guards::require_organization_access,
    middleware::tenant::TenantContext,
    utils::escape_like_wildcards,
    AppState,
};

/// Snapshot cache TTL in seconds.
const SNAPSHOT_TTL_SECONDS: u64 = 60;

/// Admin-initiated, token-based organization setup.
///
/// Creates the tenant in a trialing state and issues an owner invitation;
/// the owner account is created when the invitation is accepted, which
/// also claims ownership of the organization.
#[with_permission(Permission::Organizations(OrganizationAction::Create))]
pub async fn create_organization_handler(
    state: &AppState,
    identity: Identity,
    req: CreateOrganizationRequest,
) -> Result<Json<ApiResponse<OrganizationSetupResponse>>> {
    req.validate()?;

    let plan = match req.plan.as_deref() {
        None => Plan::Professional,
        Some(value) => {
            Plan::from_string(value).ok_or_else(|| {
                AppError::bad_request(
                    "Invalid plan. Must be one of: free, professional, business, enterprise",
                )
            })?
        },
    };

    let slug = crate::utils::slugify(&req.name);
    if slug.is_empty() {
        return Err(AppError::validation(
            "Organization name must contain at least one letter or digit",
        ));
    }
    let slug_taken = organizations::Entity::find()
        .filter(organizations::Column::Slug.eq(&slug))
        .one(&state.db)
        .await?
        .is_some();
    if slug_taken {
        return Err(AppError::conflict(
            "An organization with this name already exists",
        ));
    }

    let now = Utc::now();
    let organization = organizations::ActiveModel {
        id: Set(crate::ids::organization_id()),
        name: Set(req.name.clone()),
        slug: Set(slug),
        plan: Set(plan),
        subscription_status: Set(SubscriptionStatus::Trialing),
        trial_ends_at: Set(Some(
            now + chrono::Duration::days(i64::from(state.billing_config.trial_days)),
        )),
        // Claimed by the invited owner on acceptance.
        owner_id: Set(String::new()),
        user_count: Set(0),
        team_count: Set(0),
        billing_customer_id: Set(None),
        billing_subscription_id: Set(None),
        cancel_at_period_end: Set(false),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    let created = organization.insert(&state.db).await?;

    let token = crate::refresh_tokens::generate_refresh_token();
    let invitation = entity::invitations::ActiveModel {
        id: Set(crate::ids::invitation_id()),
        organization_id: Set(created.id.clone()),
        team_id: Set(None),
        email: Set(req.owner_email.clone()),
        role: Set(entity::users::UserRole::OrgOwner),
        token: Set(token.clone()),
        status: Set(entity::invitations::InvitationStatus::Pending),
        invited_by: Set(identity.id.clone()),
        expires_at: Set(now + chrono::Duration::days(7)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let invitation = invitation.insert(&state.db).await?;

    state
        .mailer
        .send_invitation(&req.owner_email, &created.name, &token);

    info!(
        organization_id = %created.id,
        invitation_id = %invitation.id,
        created_by = %identity.id,
        "Organization set up, owner invitation issued"
    );

    Ok(Json(ApiResponse::ok(
        "Organization created, owner invitation sent",
        OrganizationSetupResponse {
            organization: OrganizationResponse::from_model(&created),
            invitation:   crate::dto::invitations::InvitationResponse::from_model(&invitation),
        },
    )))
}

/// Get the caller's own organization, via the snapshot cache.
#[with_permission(Permission::Organizations(OrganizationAction::Read))]
pub async fn get_my_organization_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
) -> Result<Json<ApiResponse<OrganizationResponse>>> {
    let cache = Cache::new(state.redis.clone());
    let key = organization_key(tenant.organization_id());

    if let Some(snapshot) = cache.get_json::<OrganizationResponse>(&key).await {
        return Ok(Json(ApiResponse::ok("Organization retrieved", snapshot)));
    }

    let org = gate::load_organization(&state.db, tenant.organization_id()).await?;
    let response = OrganizationResponse::from_model(&org);

    cache.set_json(&key, &response, SNAPSHOT_TTL_SECONDS).await;

    Ok(Json(ApiResponse::ok("Organization retrieved", response)))
}

/// Update the caller's organization.
#[with_permission(Permission::Organizations(OrganizationAction::Update))]
pub async fn update_organization_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    req: UpdateOrganizationRequest,
) -> Result<Json<ApiResponse<OrganizationResponse>>> {
    req.validate()?;

    let org = gate::load_organization(&state.db, tenant.organization_id()).await?;

    let mut active: organizations::ActiveModel = org.into();
    if let Some(name) = req.name {
        active.name = Set(name);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;

    Cache::new(state.redis.clone())
        .delete(&organization_key(tenant.organization_id()))
        .await;

    info!(organization_id = %updated.id, user_id = %identity.id, "Organization updated");

    Ok(Json(ApiResponse::ok(
        "Organization updated",
        OrganizationResponse::from_model(&updated),
    )))
}

/// Change an organization's plan directly (platform admins only; tenant
/// owners change plans through checkout).
///
/// Limits are derived from the plan, so the change takes effect on the
/// next quota check with no separate limit write.
pub async fn change_plan_handler(
    state: &AppState,
    identity: Identity,
    organization_id: &str,
    req: ChangePlanRequest,
) -> Result<Json<ApiResponse<OrganizationResponse>>> {
    req.validate()?;
    crate::guards::enforce(guards::platform_admin(&identity))?;

    let plan = Plan::from_string(&req.plan).ok_or_else(|| {
        AppError::bad_request("Invalid plan. Must be one of: free, professional, business, enterprise")
    })?;

    let org = gate::load_organization(&state.db, organization_id).await?;

    let mut active: organizations::ActiveModel = org.into();
    active.plan = Set(plan);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;

    Cache::new(state.redis.clone())
        .delete(&organization_key(organization_id))
        .await;

    info!(
        organization_id = %organization_id,
        plan = %plan,
        user_id = %identity.id,
        "Organization plan changed"
    );

    Ok(Json(ApiResponse::ok(
        "Plan changed",
        OrganizationResponse::from_model(&updated),
    )))
}

/// List all organizations (platform admins only).
#[with_permission(Permission::Organizations(OrganizationAction::List))]
pub async fn list_organizations_handler(
    state: &AppState,
    identity: Identity,
    query: ListQuery,
) -> Result<Json<ApiResponse<Vec<OrganizationResponse>>>> {
    let page = query.page();
    let per_page = query.per_page();

    let mut base_query =
        organizations::Entity::find().filter(organizations::Column::DeletedAt.is_null());

    if let Some(ref search) = query.search {
        let pattern = format!("%{}%", escape_like_wildcards(search));
        base_query = base_query.filter(
            Condition::any()
                .add(organizations::Column::Name.like(&pattern))
                .add(organizations::Column::Slug.like(&pattern)),
        );
    }

    let total = base_query.clone().count(&state.db).await?;

    let page_models = base_query
        .order_by_asc(organizations::Column::Name)
        .paginate(&state.db, per_page)
        .fetch_page(page.saturating_sub(1))
        .await?;

    let data: Vec<OrganizationResponse> = page_models
        .iter()
        .map(OrganizationResponse::from_model)
        .collect();

    Ok(Json(ApiResponse::paginated(
        "Organizations retrieved",
        data,
        PaginationMeta::new(page, per_page, total),
    )))
}

/// Get an organization by explicit id.
///
/// The cross-tenant guard runs before the load so a denied caller learns
/// nothing about the target.
#[with_permission(Permission::Organizations(OrganizationAction::Read))]
pub async fn get_organization_handler(
    state: &AppState,
    identity: Identity,
    organization_id: &str,
) -> Result<Json<ApiResponse<OrganizationResponse>>> {
    require_organization_access(&identity, organization_id)?;

    let org = gate::load_organization(&state.db, organization_id).await?;

    Ok(Json(ApiResponse::ok(
        "Organization retrieved",
        OrganizationResponse::from_model(&org),
    )))
}

/// Soft-delete an organization.
///
/// Deletion immediately cancels the subscription.
#[with_permission(Permission::Organizations(OrganizationAction::Delete))]
pub async fn delete_organization_handler(
    state: &AppState,
    identity: Identity,
    organization_id: &str,
) -> Result<Json<ApiResponse<()>>> {
    require_organization_access(&identity, organization_id)?;

    let org = gate::load_organization(&state.db, organization_id).await?;

    let now = Utc::now();
    let mut active: organizations::ActiveModel = org.into();
    active.is_active = Set(false);
    active.subscription_status = Set(SubscriptionStatus::Canceled);
    active.deleted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(&state.db).await?;

    Cache::new(state.redis.clone())
        .delete(&organization_key(organization_id))
        .await;

    info!(organization_id = %organization_id, user_id = %identity.id, "Organization soft-deleted");

    Ok(Json(ApiResponse::message("Organization deleted")))
}
