//! # Authentication Handlers
//!
//! Registration, login, token refresh, logout and password management.

use auth::{
    create_access_token,
    hash_password,
    secrecy::{ExposeSecret, SecretString},
    validate_password_strength,
    verify_password,
    Identity,
};
use axum::Json;
use chrono::{Duration, Utc};
use entity::{
    organizations::{self, Plan, SubscriptionStatus},
    users::{self, UserRole},
};
use error::{ApiResponse, AppError, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::info;
use validator::Validate;

use crate::{
    dto::auth::{
        AuthSuccess,
        AuthTokens,
        AuthenticatedUserResponse,
        ChangePasswordRequest,
        LoginRequest,
        RefreshRequest,
        RegisterRequest,
    },
    ids,
    refresh_tokens::{
        create_refresh_token,
        generate_refresh_token,
        revoke_all_user_tokens,
        revoke_refresh_token,
        validate_refresh_token,
    },
    utils::slugify,
    AppState,
};

/// Refresh token lifetime: 30 days.
const REFRESH_TOKEN_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Register a new organization with its owner account.
///
/// The organization starts on a 14-day professional trial; the owner is
/// created with the OrgOwner role.
pub async fn register_handler(
    state: &AppState,
    req: RegisterRequest,
) -> Result<Json<ApiResponse<AuthSuccess>>> {
    req.validate()?;

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

    let slug = slugify(&req.organization_name);
    if slug.is_empty() {
        return Err(AppError::validation("Organization name must contain at least one letter or digit"));
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
    let organization_id = ids::organization_id();
    let user_id = ids::user_id();

    let password_secret = SecretString::from(req.password);
    let password_hash = hash_password(&password_secret)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))?;

    let organization = organizations::ActiveModel {
        id: Set(organization_id.clone()),
        name: Set(req.organization_name.clone()),
        slug: Set(slug),
        plan: Set(Plan::Professional),
        subscription_status: Set(SubscriptionStatus::Trialing),
        trial_ends_at: Set(Some(
            now + Duration::days(i64::from(state.billing_config.trial_days)),
        )),
        owner_id: Set(user_id.clone()),
        user_count: Set(1),
        team_count: Set(0),
        billing_customer_id: Set(None),
        billing_subscription_id: Set(None),
        cancel_at_period_end: Set(false),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    organization.insert(&state.db).await?;

    let user = users::ActiveModel {
        id: Set(user_id.clone()),
        email: Set(req.email.clone()),
        password_hash: Set(password_hash.expose_secret().to_string()),
        first_name: Set(req.first_name),
        last_name: Set(req.last_name),
        role: Set(UserRole::OrgOwner),
        organization_id: Set(Some(organization_id.clone())),
        is_active: Set(true),
        must_change_password: Set(false),
        last_login_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    let user = user.insert(&state.db).await?;

    info!(
        organization_id = %organization_id,
        user_id = %user.id,
        trial_days = state.billing_config.trial_days,
        "Organization registered with trial"
    );

    let payload = issue_auth_success(state, &user).await?;
    Ok(Json(ApiResponse::ok("Organization registered", payload)))
}

/// Log a user in with email and password.
pub async fn login_handler(
    state: &AppState,
    req: LoginRequest,
) -> Result<Json<ApiResponse<AuthSuccess>>> {
    req.validate()?;

    let user = users::Entity::find()
        .filter(users::Column::Email.eq(&req.email))
        .filter(users::Column::DeletedAt.is_null())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    let password_secret = SecretString::from(req.password);
    verify_password(&password_secret, &user.password_hash)
        .map_err(|_| AppError::unauthorized("Invalid email or password"))?;

    if !user.is_active {
        return Err(AppError::unauthorized("Account is not active"));
    }

    let mut active: users::ActiveModel = user.clone().into();
    active.last_login_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let user = active.update(&state.db).await?;

    info!(user_id = %user.id, "User logged in");

    let payload = issue_auth_success(state, &user).await?;
    Ok(Json(ApiResponse::ok("Logged in", payload)))
}

/// Exchange a refresh token for a new token pair (rotation).
pub async fn refresh_handler(
    state: &AppState,
    req: RefreshRequest,
) -> Result<Json<ApiResponse<AuthSuccess>>> {
    req.validate()?;

    let user_id = validate_refresh_token(&state.db, &req.refresh_token).await?;

    let user = users::Entity::find_by_id(&user_id)
        .one(&state.db)
        .await?
        .filter(|u| u.deleted_at.is_none())
        .ok_or_else(|| AppError::unauthorized("User associated with refresh token not found"))?;

    if !user.is_active {
        return Err(AppError::unauthorized("Account is not active"));
    }

    // Rotate: issue a fresh pair, then revoke the presented token.
    let payload = issue_auth_success(state, &user).await?;
    revoke_refresh_token(&state.db, &req.refresh_token).await?;

    info!(user_id = %user.id, "Refresh token rotated");

    Ok(Json(ApiResponse::ok("Token refreshed", payload)))
}

/// Log out: revoke every refresh token for the caller.
pub async fn logout_handler(state: &AppState, identity: Identity) -> Result<Json<ApiResponse<()>>> {
    revoke_all_user_tokens(&state.db, &identity.id).await?;

    info!(user_id = %identity.id, "User logged out");

    Ok(Json(ApiResponse::message("Successfully logged out")))
}

/// Return the caller's profile together with trial information.
pub async fn me_handler(
    state: &AppState,
    identity: Identity,
) -> Result<Json<ApiResponse<crate::dto::users::UserResponse>>> {
    let user = users::Entity::find_by_id(&identity.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok(
        "Profile retrieved",
        crate::dto::users::UserResponse::from_model(&user),
    )))
}

/// Change the caller's password; revokes every refresh token.
pub async fn change_password_handler(
    state: &AppState,
    identity: Identity,
    req: ChangePasswordRequest,
) -> Result<Json<ApiResponse<()>>> {
    req.validate()?;

    if let Err(errors) = validate_password_strength(&req.new_password) {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(AppError::validation(messages.join(", ")));
    }

    let user = users::Entity::find_by_id(&identity.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let current = SecretString::from(req.current_password);
    verify_password(&current, &user.password_hash)
        .map_err(|_| AppError::unauthorized("Current password is incorrect"))?;

    let new_secret = SecretString::from(req.new_password);
    let new_hash = hash_password(&new_secret)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))?;

    let mut active: users::ActiveModel = user.into();
    active.password_hash = Set(new_hash.expose_secret().to_string());
    active.must_change_password = Set(false);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    revoke_all_user_tokens(&state.db, &identity.id).await?;

    info!(user_id = %identity.id, "Password changed, sessions revoked");

    Ok(Json(ApiResponse::message("Password changed")))
}

/// Issue a token pair and the user summary for auth responses.
async fn issue_auth_success(state: &AppState, user: &users::Model) -> Result<AuthSuccess> {
    let access_token = create_access_token(
        &state.jwt_config,
        &user.id,
        &user.email,
        user.role,
        user.organization_id.as_deref(),
    )?;

    let refresh_token = generate_refresh_token();
    create_refresh_token(&state.db, &user.id, &refresh_token, REFRESH_TOKEN_SECONDS).await?;

    Ok(AuthSuccess {
        user:   AuthenticatedUserResponse {
            id:              user.id.clone(),
            email:           user.email.clone(),
            display_name:    display_name(user),
            role:            user.role.to_string(),
            organization_id: user.organization_id.clone(),
        },
        tokens: AuthTokens {
            access_token,
            refresh_token,
            expires_in: state.jwt_config.expiration_seconds,
            token_type: "Bearer".to_string(),
        },
    })
}

/// "First Last" with graceful fallbacks.
fn display_name(user: &users::Model) -> String {
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
