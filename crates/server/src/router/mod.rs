//! # API Router Configuration
//!
//! Route wiring for the Meridian API. Thin wrapper handlers adapt axum
//! extractors to the `(&AppState, Identity, args)` handler functions.
//!
//! Layer order per route group:
//! request-id → identity resolver → (tenant context) → handler.
//! Routes that operate on a resource loaded by id (teams, explicit
//! `:organization_id` routes) skip the tenant layer: their guards carry
//! the tenant check, and platform admins without an organization must be
//! able to reach them.

use auth::Identity;
use axum::{
    extract::{Extension, Path, Query, State as AxumState},
    http::HeaderMap,
    middleware,
    routing::{delete, get, patch, post},
    Json,
    Router,
};
use error::{ApiResponse, Result};

use crate::{
    dto::{
        auth::{
            AuthSuccess,
            ChangePasswordRequest,
            LoginRequest,
            RefreshRequest,
            RegisterRequest,
        },
        billing::{CheckoutResponse, CreateCheckoutRequest, CreatePortalRequest, PortalResponse},
        invitations::{AcceptInvitationRequest, CreateInvitationRequest, InvitationResponse},
        organizations::{
            ChangePlanRequest,
            CreateOrganizationRequest,
            OrganizationResponse,
            OrganizationSetupResponse,
            UpdateOrganizationRequest,
        },
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
        users::{CreateUserRequest, UpdateUserRequest, UserResponse},
        ListQuery,
    },
    handlers,
    middleware::{auth as auth_mw, request_id, tenant, tenant::TenantContext},
    AppState,
};

/// Creates the main application router.
pub fn create_app_router(state: AppState) -> Router {
    Router::new()
        .merge(create_health_router(state.clone()))
        .merge(create_api_router(state))
        .layer(middleware::from_fn(request_id::request_id_middleware))
}

/// Creates the health check router.
fn create_health_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

async fn health(AxumState(state): AxumState<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::ok(
        "OK",
        serde_json::json!({
            "uptimeSeconds": state.start_time.elapsed().as_secs(),
        }),
    ))
}

/// Creates the API router with all route groups.
fn create_api_router(state: AppState) -> Router {
    // Public routes: no identity required. The optional resolver and
    // tenant layers still run so a presented credential is available to
    // handlers, but every resolution failure is silently swallowed.
    let public_routes = Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/invitations/accept", post(accept_invitation))
        .route("/api/v1/billing/webhook", post(billing_webhook))
        .layer(middleware::from_fn(tenant::optional_tenant_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_mw::optional_auth_middleware,
        ));

    // Authenticated routes that are not bound to the caller's tenant:
    // resource guards enforce tenancy from the loaded resource, and
    // platform admins (no organization) must be able to reach them.
    let authenticated_routes = Router::new()
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/auth/change-password", post(change_password))
        .route(
            "/api/v1/organizations",
            get(list_organizations).post(create_organization),
        )
        .route(
            "/api/v1/organizations/{organization_id}",
            get(get_organization).delete(delete_organization),
        )
        .route(
            "/api/v1/organizations/{organization_id}/plan",
            patch(change_plan),
        )
        .route(
            "/api/v1/teams/{team_id}",
            get(get_team).patch(update_team).delete(delete_team),
        )
        .route("/api/v1/teams/{team_id}/approval", patch(update_team_approval))
        .route(
            "/api/v1/teams/{team_id}/members",
            get(list_team_members).post(add_team_member),
        )
        .route(
            "/api/v1/teams/{team_id}/members/{member_id}",
            delete(remove_team_member),
        )
        .route("/api/v1/teams/bulk-delete", post(bulk_delete_teams))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_mw::auth_middleware,
        ));

    // Tenant-scoped routes: identity plus tenant context.
    let tenant_routes = Router::new()
        .route(
            "/api/v1/organization",
            get(get_my_organization).patch(update_my_organization),
        )
        .route("/api/v1/users", get(list_users).post(create_user))
        .route(
            "/api/v1/users/{user_id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/api/v1/teams", get(list_teams).post(create_team))
        .route(
            "/api/v1/invitations",
            get(list_invitations).post(create_invitation),
        )
        .route(
            "/api/v1/invitations/{invitation_id}/revoke",
            post(revoke_invitation),
        )
        .route("/api/v1/billing/checkout", post(billing_checkout))
        .route("/api/v1/billing/portal", post(billing_portal))
        .route("/api/v1/billing/cancel", post(billing_cancel))
        .route("/api/v1/billing/reactivate", post(billing_reactivate))
        .layer(middleware::from_fn(tenant::tenant_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_mw::auth_middleware,
        ));

    public_routes
        .merge(authenticated_routes)
        .merge(tenant_routes)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Auth wrappers

async fn register(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AuthSuccess>>> {
    handlers::auth::register_handler(&state, req).await
}

async fn login(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthSuccess>>> {
    handlers::auth::login_handler(&state, req).await
}

async fn refresh(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AuthSuccess>>> {
    handlers::auth::refresh_handler(&state, req).await
}

async fn logout(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<()>>> {
    handlers::auth::logout_handler(&state, identity).await
}

async fn me(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    handlers::auth::me_handler(&state, identity).await
}

async fn change_password(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    handlers::auth::change_password_handler(&state, identity, req).await
}

// ---------------------------------------------------------------------------
// Organization wrappers

async fn get_my_organization(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<Json<ApiResponse<OrganizationResponse>>> {
    handlers::organizations::get_my_organization_handler(&state, identity, tenant).await
}

async fn update_my_organization(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Json(req): Json<UpdateOrganizationRequest>,
) -> Result<Json<ApiResponse<OrganizationResponse>>> {
    handlers::organizations::update_organization_handler(&state, identity, tenant, req).await
}

async fn create_organization(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<Json<ApiResponse<OrganizationSetupResponse>>> {
    handlers::organizations::create_organization_handler(&state, identity, req).await
}

async fn list_organizations(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<OrganizationResponse>>>> {
    handlers::organizations::list_organizations_handler(&state, identity, query).await
}

async fn get_organization(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path(organization_id): Path<String>,
) -> Result<Json<ApiResponse<OrganizationResponse>>> {
    handlers::organizations::get_organization_handler(&state, identity, &organization_id).await
}

async fn delete_organization(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path(organization_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    handlers::organizations::delete_organization_handler(&state, identity, &organization_id).await
}

async fn change_plan(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path(organization_id): Path<String>,
    Json(req): Json<ChangePlanRequest>,
) -> Result<Json<ApiResponse<OrganizationResponse>>> {
    handlers::organizations::change_plan_handler(&state, identity, &organization_id, req).await
}

// ---------------------------------------------------------------------------
// User wrappers

async fn list_users(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>> {
    handlers::users::list_users_handler(&state, identity, tenant, query).await
}

async fn create_user(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    handlers::users::create_user_handler(&state, identity, tenant, req).await
}

async fn get_user(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    handlers::users::get_user_handler(&state, identity, tenant, &user_id).await
}

async fn update_user(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    handlers::users::update_user_handler(&state, identity, tenant, &user_id, req).await
}

async fn delete_user(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    handlers::users::delete_user_handler(&state, identity, tenant, &user_id).await
}

// ---------------------------------------------------------------------------
// Team wrappers

async fn list_teams(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<TeamResponse>>>> {
    handlers::teams::list_teams_handler(&state, identity, tenant, query).await
}

async fn create_team(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Json(req): Json<CreateTeamRequest>,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    handlers::teams::create_team_handler(&state, identity, tenant, req).await
}

async fn get_team(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_id): Path<String>,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    handlers::teams::get_team_handler(&state, identity, &team_id).await
}

async fn update_team(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_id): Path<String>,
    Json(req): Json<UpdateTeamRequest>,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    handlers::teams::update_team_handler(&state, identity, &team_id, req).await
}

async fn update_team_approval(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_id): Path<String>,
    Json(req): Json<UpdateTeamApprovalRequest>,
) -> Result<Json<ApiResponse<TeamResponse>>> {
    handlers::teams::update_team_approval_handler(&state, identity, &team_id, req).await
}

async fn delete_team(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    handlers::teams::delete_team_handler(&state, identity, &team_id).await
}

async fn bulk_delete_teams(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<BulkDeleteTeamsRequest>,
) -> Result<Json<ApiResponse<BulkDeleteTeamsResponse>>> {
    handlers::teams::bulk_delete_teams_handler(&state, identity, req).await
}

async fn list_team_members(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<TeamMemberResponse>>>> {
    handlers::teams::list_team_members_handler(&state, identity, &team_id).await
}

async fn add_team_member(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_id): Path<String>,
    Json(req): Json<AddTeamMemberRequest>,
) -> Result<Json<ApiResponse<TeamMemberResponse>>> {
    handlers::teams::add_team_member_handler(&state, identity, &team_id, req).await
}

async fn remove_team_member(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Path((team_id, member_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<()>>> {
    handlers::teams::remove_team_member_handler(&state, identity, &team_id, &member_id).await
}

// ---------------------------------------------------------------------------
// Invitation wrappers

async fn list_invitations(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<InvitationResponse>>>> {
    handlers::invitations::list_invitations_handler(&state, identity, tenant, query).await
}

async fn create_invitation(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Json(req): Json<CreateInvitationRequest>,
) -> Result<Json<ApiResponse<InvitationResponse>>> {
    handlers::invitations::create_invitation_handler(&state, identity, tenant, req).await
}

async fn revoke_invitation(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Path(invitation_id): Path<String>,
) -> Result<Json<ApiResponse<InvitationResponse>>> {
    handlers::invitations::revoke_invitation_handler(&state, identity, tenant, &invitation_id).await
}

async fn accept_invitation(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<AcceptInvitationRequest>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    handlers::invitations::accept_invitation_handler(&state, req).await
}

// ---------------------------------------------------------------------------
// Billing wrappers

async fn billing_checkout(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Json(req): Json<CreateCheckoutRequest>,
) -> Result<Json<ApiResponse<CheckoutResponse>>> {
    handlers::billing::create_checkout_handler(&state, identity, tenant, req).await
}

async fn billing_portal(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
    Json(req): Json<CreatePortalRequest>,
) -> Result<Json<ApiResponse<PortalResponse>>> {
    handlers::billing::create_portal_handler(&state, identity, tenant, req).await
}

async fn billing_cancel(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<Json<ApiResponse<()>>> {
    handlers::billing::cancel_subscription_handler(&state, identity, tenant).await
}

async fn billing_reactivate(
    AxumState(state): AxumState<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<Json<ApiResponse<()>>> {
    handlers::billing::reactivate_subscription_handler(&state, identity, tenant).await
}

async fn billing_webhook(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<ApiResponse<()>>> {
    let signature = headers
        .get("x-billing-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    handlers::billing::webhook_handler(&state, signature, &body).await
}
