//! # User Handlers
//!
//! Org-scoped user management. Every operation runs inside the caller's
//! tenant; creations pass the subscription gate and reserve a user slot
//! under the plan ceiling before any write.

use auth::{
    hash_password,
    rbac::{Permission, UserAction},
    secrecy::{ExposeSecret, SecretString},
    validate_password_strength,
    Identity,
};
use axum::Json;
use chrono::Utc;
use entity::users::{self, UserRole};
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
        users::{CreateUserRequest, UpdateUserRequest, UserResponse},
        ListQuery,
    },
    gate,
    ids,
    middleware::tenant::TenantContext,
    utils::escape_like_wildcards,
    AppState,
};

/// List the users of the caller's organization, with pagination and search.
#[with_permission(Permission::Users(UserAction::Read))]
pub async fn list_users_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    query: ListQuery,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>> {
    let page = query.page();
    let per_page = query.per_page();

    let mut base_query = users::Entity::find()
        .filter(users::Column::OrganizationId.eq(tenant.organization_id()))
        .filter(users::Column::DeletedAt.is_null());

    if let Some(ref search) = query.search {
        let pattern = format!("%{}%", escape_like_wildcards(search));
        base_query = base_query.filter(
            Condition::any()
                .add(users::Column::Email.like(&pattern))
                .add(users::Column::FirstName.like(&pattern))
                .add(users::Column::LastName.like(&pattern)),
        );
    }

    let total = base_query.clone().count(&state.db).await?;

    let ordered = match query.sort.as_deref() {
        Some("last_login_at") => base_query.order_by_desc(users::Column::LastLoginAt),
        Some("created_at") => base_query.order_by_desc(users::Column::CreatedAt),
        _ => base_query.order_by_asc(users::Column::Email),
    };

    let page_models = ordered
        .paginate(&state.db, per_page)
        .fetch_page(page.saturating_sub(1))
        .await?;

    let data: Vec<UserResponse> = page_models.iter().map(UserResponse::from_model).collect();

    Ok(Json(ApiResponse::paginated(
        "Users retrieved",
        data,
        PaginationMeta::new(page, per_page, total),
    )))
}

/// Get a single user in the caller's organization.
#[with_permission(Permission::Users(UserAction::Read))]
pub async fn get_user_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    user_id: &str,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let user = load_tenant_user(state, &identity, &tenant, user_id).await?;
    Ok(Json(ApiResponse::ok(
        "User retrieved",
        UserResponse::from_model(&user),
    )))
}

/// Create a user inside the caller's organization.
///
/// Passes the subscription gate, then reserves a user slot before the
/// insert; the reservation is rolled back if the insert fails.
#[with_permission(Permission::Users(UserAction::Create))]
pub async fn create_user_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    req: CreateUserRequest,
) -> Result<Json<ApiResponse<UserResponse>>> {
    req.validate()?;

    let org = gate::require_feature_access(state, &identity).await?;

    let role = parse_org_role(&req.role)?;

    if let Err(errors) = validate_password_strength(&req.password) {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(AppError::validation(messages.join(", ")));
    }

    let existing = users::Entity::find()
        .filter(users::Column::Email.eq(&req.email))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("Email is already registered"));
    }

    let password_secret = SecretString::from(req.password);
    let password_hash = hash_password(&password_secret)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))?;

    // Quota check happens here, before any write of the user itself.
    gate::reserve_user_slot(&state.db, &org).await?;

    let now = Utc::now();
    let user = users::ActiveModel {
        id: Set(ids::user_id()),
        email: Set(req.email),
        password_hash: Set(password_hash.expose_secret().to_string()),
        first_name: Set(req.first_name),
        last_name: Set(req.last_name),
        role: Set(role),
        organization_id: Set(Some(tenant.organization_id().to_string())),
        is_active: Set(true),
        must_change_password: Set(true),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    let created = match user.insert(&state.db).await {
        Ok(created) => created,
        Err(e) => {
            gate::release_user_slot(&state.db, tenant.organization_id()).await?;
            return Err(e.into());
        },
    };

    info!(
        user_id = %created.id,
        organization_id = %tenant.organization_id(),
        created_by = %identity.id,
        "User created"
    );

    Ok(Json(ApiResponse::ok(
        "User created",
        UserResponse::from_model(&created),
    )))
}

/// Update a user's profile, role or active status.
#[with_permission(Permission::Users(UserAction::Update))]
pub async fn update_user_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    user_id: &str,
    req: UpdateUserRequest,
) -> Result<Json<ApiResponse<UserResponse>>> {
    req.validate()?;

    let user = load_tenant_user(state, &identity, &tenant, user_id).await?;

    let mut active: users::ActiveModel = user.into();

    if let Some(first_name) = req.first_name {
        active.first_name = Set(Some(first_name));
    }
    if let Some(last_name) = req.last_name {
        active.last_name = Set(Some(last_name));
    }
    if let Some(role) = req.role {
        active.role = Set(parse_org_role(&role)?);
    }
    if let Some(is_active) = req.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;

    info!(user_id = %user_id, updated_by = %identity.id, "User updated");

    Ok(Json(ApiResponse::ok(
        "User updated",
        UserResponse::from_model(&updated),
    )))
}

/// Soft-delete a user and release their plan slot.
#[with_permission(Permission::Users(UserAction::Delete))]
pub async fn delete_user_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    user_id: &str,
) -> Result<Json<ApiResponse<()>>> {
    if user_id == identity.id {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }

    let user = load_tenant_user(state, &identity, &tenant, user_id).await?;

    let org = gate::load_organization(&state.db, tenant.organization_id()).await?;
    if org.owner_id == user.id {
        return Err(AppError::bad_request(
            "The organization owner cannot be deleted. Transfer ownership first.",
        ));
    }

    let now = Utc::now();
    let mut active: users::ActiveModel = user.into();
    active.deleted_at = Set(Some(now));
    active.is_active = Set(false);
    active.updated_at = Set(now);
    active.update(&state.db).await?;

    gate::release_user_slot(&state.db, tenant.organization_id()).await?;

    info!(user_id = %user_id, deleted_by = %identity.id, "User soft-deleted");

    Ok(Json(ApiResponse::message("User deleted")))
}

/// Load a user and require it to live in the caller's organization.
///
/// Cross-tenant hits are reported as an explicit cross-org denial, not as
/// a missing resource.
async fn load_tenant_user(
    state: &AppState,
    identity: &Identity,
    tenant: &TenantContext,
    user_id: &str,
) -> Result<users::Model> {
    let user = users::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .filter(|u| u.deleted_at.is_none())
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !identity.is_platform_admin() &&
        user.organization_id.as_deref() != Some(tenant.organization_id())
    {
        return Err(AppError::forbidden(
            "cross-org: user belongs to a different organization",
        ));
    }

    Ok(user)
}

/// Parse a tenant-level role; platform roles cannot be assigned here.
fn parse_org_role(role: &str) -> Result<UserRole> {
    match UserRole::from_string(role) {
        Some(role @ (UserRole::OrgOwner | UserRole::OrgAdmin | UserRole::OrgMember)) => Ok(role),
        Some(_) => {
            Err(AppError::bad_request(
                "Platform roles cannot be assigned to organization users",
            ))
        },
        None => {
            Err(AppError::bad_request(
                "Invalid role. Must be one of: org_owner, org_admin, org_member",
            ))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_org_role_valid() {
        assert_eq!(parse_org_role("org_owner").unwrap(), UserRole::OrgOwner);
        assert_eq!(parse_org_role("org_admin").unwrap(), UserRole::OrgAdmin);
        assert_eq!(parse_org_role("org_member").unwrap(), UserRole::OrgMember);
    }

    #[test]
    fn test_parse_org_role_rejects_platform_roles() {
        assert!(parse_org_role("super_admin").is_err());
        assert!(parse_org_role("admin").is_err());
    }

    #[test]
    fn test_parse_org_role_rejects_unknown() {
        assert!(parse_org_role("member").is_err());
        assert!(parse_org_role("").is_err());
    }
}
