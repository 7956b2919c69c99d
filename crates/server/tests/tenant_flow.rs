//! Integration tests for the tenant lifecycle: quota enforcement, the
//! trial sweep, cross-org guards and invitation acceptance.
//!
//! Runs against an in-memory SQLite database with the real migrations;
//! Redis is intentionally unreachable so the cache degrades to misses.

use std::{collections::HashSet, sync::Arc};

use auth::{Identity, JwtConfig};
use base64::Engine;
use billing::{BillingConfig, StubBillingService};
use chrono::{Duration, Utc};
use entity::{
    invitations::{self, InvitationStatus},
    organizations::{self, Plan, SubscriptionStatus},
    teams,
    users::{self, UserRole},
};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use server::{email::Mailer, gate, guards, handlers, sweep, AppState};

/// Build an AppState backed by a fresh in-memory database.
///
/// A single pooled connection, otherwise every pool member would open its
/// own empty in-memory database.
async fn test_state() -> AppState {
    let mut options = sea_orm::ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = sea_orm::Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    migration::Migrator::up(&db, None)
        .await
        .expect("Migrations failed");

    let redis = redis::Client::open("redis://127.0.0.1:1").expect("Failed to build Redis client");

    let jwt_config = JwtConfig {
        secret:             base64::engine::general_purpose::STANDARD
            .encode("meridian-test-secret-at-least-32-bytes"),
        expiration_seconds: 3600,
        issuer:             "meridian-test".to_string(),
        audience:           "meridian-test-api".to_string(),
    };

    AppState::new(
        db,
        jwt_config,
        redis,
        Arc::new(StubBillingService),
        BillingConfig::test(),
        Mailer::disabled(),
    )
}

async fn insert_org(
    state: &AppState,
    id: &str,
    plan: Plan,
    status: SubscriptionStatus,
    trial_ends_at: Option<chrono::DateTime<chrono::Utc>>,
    user_count: i32,
    team_count: i32,
) -> organizations::Model {
    let now = Utc::now();
    organizations::ActiveModel {
        id: Set(id.to_string()),
        name: Set(format!("Org {}", id)),
        slug: Set(id.replace('_', "-")),
        plan: Set(plan),
        subscription_status: Set(status),
        trial_ends_at: Set(trial_ends_at),
        owner_id: Set(format!("usr_owner_{}", id)),
        user_count: Set(user_count),
        team_count: Set(team_count),
        billing_customer_id: Set(None),
        billing_subscription_id: Set(None),
        cancel_at_period_end: Set(false),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(&state.db)
    .await
    .expect("Failed to insert organization")
}

async fn insert_user(
    state: &AppState,
    id: &str,
    email: &str,
    role: UserRole,
    organization_id: Option<&str>,
) -> users::Model {
    let now = Utc::now();
    users::ActiveModel {
        id: Set(id.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("unused".to_string()),
        first_name: Set(None),
        last_name: Set(None),
        role: Set(role),
        organization_id: Set(organization_id.map(|s| s.to_string())),
        is_active: Set(true),
        must_change_password: Set(false),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(&state.db)
    .await
    .expect("Failed to insert user")
}

async fn insert_team(state: &AppState, id: &str, organization_id: &str, manager_id: &str) -> teams::Model {
    let now = Utc::now();
    teams::ActiveModel {
        id: Set(id.to_string()),
        organization_id: Set(organization_id.to_string()),
        name: Set(format!("Team {}", id)),
        slug: Set(id.replace('_', "-")),
        description: Set(None),
        manager_id: Set(manager_id.to_string()),
        manager_approved: Set(entity::teams::ApprovalState::Pending),
        director_approved: Set(entity::teams::ApprovalState::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(&state.db)
    .await
    .expect("Failed to insert team")
}

fn identity(id: &str, role: UserRole, organization_id: Option<&str>) -> Identity {
    Identity {
        id:               id.to_string(),
        email:            format!("{}@example.com", id),
        role,
        organization_id:  organization_id.map(|s| s.to_string()),
        managed_team_ids: HashSet::new(),
    }
}

// ---------------------------------------------------------------------------
// Quota enforcement

#[tokio::test]
async fn team_quota_rejected_with_plan_limit_error_not_trial_error() {
    let state = test_state().await;
    // Free org, at the team ceiling, subscription fully active.
    let org = insert_org(
        &state,
        "org_a",
        Plan::Free,
        SubscriptionStatus::Active,
        None,
        1,
        3,
    )
    .await;

    let err = gate::reserve_team_slot(&state.db, &org)
        .await
        .expect_err("reservation must fail at the ceiling");

    assert_eq!(err.code(), "FORBIDDEN");
    assert!(err.message().contains("Plan limit"));
    // not a subscription/trial error
    assert_ne!(err.code(), "PAYMENT_REQUIRED");

    // The counter was not touched.
    let reloaded = gate::load_organization(&state.db, "org_a").await.unwrap();
    assert_eq!(reloaded.team_count, 3);
}

#[tokio::test]
async fn team_quota_allows_below_ceiling_and_increments() {
    let state = test_state().await;
    let org = insert_org(
        &state,
        "org_b",
        Plan::Free,
        SubscriptionStatus::Active,
        None,
        1,
        2,
    )
    .await;

    gate::reserve_team_slot(&state.db, &org)
        .await
        .expect("reservation below the ceiling must succeed");

    let reloaded = gate::load_organization(&state.db, "org_b").await.unwrap();
    assert_eq!(reloaded.team_count, 3);

    // Now at the ceiling: the next reservation fails.
    assert!(gate::reserve_team_slot(&state.db, &reloaded).await.is_err());
}

#[tokio::test]
async fn user_quota_flips_exactly_at_limit() {
    let state = test_state().await;
    let org = insert_org(
        &state,
        "org_c",
        Plan::Free,
        SubscriptionStatus::Active,
        None,
        4,
        0,
    )
    .await;

    // 4 -> 5 is allowed (free allows 5 users)
    gate::reserve_user_slot(&state.db, &org).await.unwrap();

    let at_limit = gate::load_organization(&state.db, "org_c").await.unwrap();
    assert_eq!(at_limit.user_count, 5);

    // 5 -> 6 is rejected
    let err = gate::reserve_user_slot(&state.db, &at_limit)
        .await
        .expect_err("reservation at the ceiling must fail");
    assert!(err.message().contains("Plan limit"));

    // Releasing drops back below the ceiling.
    gate::release_user_slot(&state.db, "org_c").await.unwrap();
    let after_release = gate::load_organization(&state.db, "org_c").await.unwrap();
    assert_eq!(after_release.user_count, 4);
}

// ---------------------------------------------------------------------------
// Trial sweep

#[tokio::test]
async fn expired_trial_transitions_to_past_due_exactly_once() {
    let state = test_state().await;
    let org = insert_org(
        &state,
        "org_trial",
        Plan::Professional,
        SubscriptionStatus::Trialing,
        Some(Utc::now() - Duration::seconds(1)),
        1,
        0,
    )
    .await;
    insert_user(
        &state,
        &org.owner_id.clone(),
        "owner@example.com",
        UserRole::OrgOwner,
        Some("org_trial"),
    )
    .await;

    // Gate denies the expired trial even before the sweep runs.
    assert!(!billing::can_access_features(&org, Utc::now()));

    let first = sweep::run_trial_sweep(&state).await.unwrap();
    assert_eq!(first.checked, 1);
    assert_eq!(first.transitioned, 1);
    assert_eq!(first.errors, 0);

    let reloaded = gate::load_organization(&state.db, "org_trial").await.unwrap();
    assert_eq!(reloaded.subscription_status, SubscriptionStatus::PastDue);

    // Second sweep: the org is no longer trialing, so nothing transitions.
    let second = sweep::run_trial_sweep(&state).await.unwrap();
    assert_eq!(second.checked, 0);
    assert_eq!(second.transitioned, 0);
}

#[tokio::test]
async fn trialing_with_time_left_keeps_access_and_survives_sweep() {
    let state = test_state().await;
    let org = insert_org(
        &state,
        "org_fresh",
        Plan::Professional,
        SubscriptionStatus::Trialing,
        Some(Utc::now() + Duration::days(2)),
        1,
        0,
    )
    .await;
    insert_user(
        &state,
        &org.owner_id.clone(),
        "fresh-owner@example.com",
        UserRole::OrgOwner,
        Some("org_fresh"),
    )
    .await;

    assert!(billing::can_access_features(&org, Utc::now()));

    let stats = sweep::run_trial_sweep(&state).await.unwrap();
    assert_eq!(stats.checked, 1);
    assert_eq!(stats.transitioned, 0);

    let reloaded = gate::load_organization(&state.db, "org_fresh").await.unwrap();
    assert_eq!(reloaded.subscription_status, SubscriptionStatus::Trialing);
}

#[tokio::test]
async fn sweep_sends_warning_at_three_day_mark() {
    let state = test_state().await;
    let org = insert_org(
        &state,
        "org_warn",
        Plan::Professional,
        SubscriptionStatus::Trialing,
        // Just under 3 days left: ceil rounds to 3
        Some(Utc::now() + Duration::days(3) - Duration::minutes(5)),
        1,
        0,
    )
    .await;
    insert_user(
        &state,
        &org.owner_id.clone(),
        "warn-owner@example.com",
        UserRole::OrgOwner,
        Some("org_warn"),
    )
    .await;

    let stats = sweep::run_trial_sweep(&state).await.unwrap();
    assert_eq!(stats.warnings, 1);
    assert_eq!(stats.transitioned, 0);

    // Same-day re-run resends the warning: the day count alone is the key.
    let rerun = sweep::run_trial_sweep(&state).await.unwrap();
    assert_eq!(rerun.warnings, 1);
}

// ---------------------------------------------------------------------------
// Cross-org guards

#[tokio::test]
async fn org_admin_cannot_view_foreign_team() {
    let state = test_state().await;
    insert_org(&state, "org_x", Plan::Business, SubscriptionStatus::Active, None, 2, 0).await;
    insert_org(&state, "org_y", Plan::Business, SubscriptionStatus::Active, None, 2, 1).await;
    insert_user(&state, "usr_admin_x", "admin-x@example.com", UserRole::OrgAdmin, Some("org_x")).await;
    insert_user(&state, "usr_mgr_y", "mgr-y@example.com", UserRole::OrgMember, Some("org_y")).await;
    insert_team(&state, "team_y", "org_y", "usr_mgr_y").await;

    let admin_of_x = identity("usr_admin_x", UserRole::OrgAdmin, Some("org_x"));

    let err = guards::require_team_view(&state.db, &admin_of_x, "team_y")
        .await
        .expect_err("cross-org view must be denied");
    assert_eq!(err.code(), "FORBIDDEN");
    assert!(err.message().contains("cross-org"));

    // The platform admin bypasses the tenant boundary.
    let root = identity("usr_root", UserRole::SuperAdmin, None);
    assert!(guards::require_team_view(&state.db, &root, "team_y").await.is_ok());
}

#[tokio::test]
async fn team_manager_without_admin_role_can_manage_own_team() {
    let state = test_state().await;
    insert_org(&state, "org_m", Plan::Business, SubscriptionStatus::Active, None, 2, 1).await;
    insert_user(&state, "usr_mgr", "mgr@example.com", UserRole::OrgMember, Some("org_m")).await;
    insert_team(&state, "team_m", "org_m", "usr_mgr").await;

    let manager = identity("usr_mgr", UserRole::OrgMember, Some("org_m"));
    assert!(guards::require_team_manage(&state.db, &manager, "team_m").await.is_ok());

    let other = identity("usr_other", UserRole::OrgMember, Some("org_m"));
    assert!(guards::require_team_manage(&state.db, &other, "team_m").await.is_err());
}

// ---------------------------------------------------------------------------
// Invitations

async fn insert_invitation(
    state: &AppState,
    id: &str,
    organization_id: &str,
    email: &str,
    role: UserRole,
    status: InvitationStatus,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> invitations::Model {
    let now = Utc::now();
    invitations::ActiveModel {
        id: Set(id.to_string()),
        organization_id: Set(organization_id.to_string()),
        team_id: Set(None),
        email: Set(email.to_string()),
        role: Set(role),
        token: Set(format!("token_{}", id)),
        status: Set(status),
        invited_by: Set("usr_inviter".to_string()),
        expires_at: Set(expires_at),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .expect("Failed to insert invitation")
}

#[tokio::test]
async fn expired_pending_invitation_cannot_be_accepted() {
    let state = test_state().await;
    insert_org(&state, "org_inv", Plan::Professional, SubscriptionStatus::Active, None, 1, 0).await;
    insert_invitation(
        &state,
        "inv_stale",
        "org_inv",
        "late@example.com",
        UserRole::OrgMember,
        // Status still pending, but the clock says expired.
        InvitationStatus::Pending,
        Utc::now() - Duration::hours(1),
    )
    .await;

    let req = server::dto::invitations::AcceptInvitationRequest {
        token:      "token_inv_stale".to_string(),
        password:   "CorrectHorse9!battery".to_string(),
        first_name: None,
        last_name:  None,
    };

    let err = handlers::invitations::accept_invitation_handler(&state, req)
        .await
        .expect_err("expired invitation must be rejected");
    assert_eq!(err.code(), "BAD_REQUEST");

    // The stale row was marked expired on the way out.
    let reloaded = invitations::Entity::find_by_id("inv_stale")
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, InvitationStatus::Expired);

    // No user was created.
    let user = users::Entity::find()
        .one(&state.db)
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn invitation_accept_assigns_invited_role_and_consumes_token() {
    let state = test_state().await;
    insert_org(&state, "org_join", Plan::Professional, SubscriptionStatus::Active, None, 1, 0).await;
    insert_invitation(
        &state,
        "inv_ok",
        "org_join",
        "new-admin@example.com",
        UserRole::OrgAdmin,
        InvitationStatus::Pending,
        Utc::now() + Duration::days(7),
    )
    .await;

    let req = server::dto::invitations::AcceptInvitationRequest {
        token:      "token_inv_ok".to_string(),
        password:   "CorrectHorse9!battery".to_string(),
        first_name: Some("New".to_string()),
        last_name:  Some("Admin".to_string()),
    };

    let response = handlers::invitations::accept_invitation_handler(&state, req)
        .await
        .expect("valid invitation must be accepted");
    let created = response.0.data.expect("user payload");
    assert_eq!(created.role, "org_admin");
    assert_eq!(created.organization_id.as_deref(), Some("org_join"));

    // Consumed exactly once.
    let invitation = invitations::Entity::find_by_id("inv_ok")
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invitation.status, InvitationStatus::Accepted);

    // Usage counter reflects the new member.
    let org = gate::load_organization(&state.db, "org_join").await.unwrap();
    assert_eq!(org.user_count, 2);

    // A second accept with the same token fails.
    let replay = server::dto::invitations::AcceptInvitationRequest {
        token:      "token_inv_ok".to_string(),
        password:   "CorrectHorse9!battery".to_string(),
        first_name: None,
        last_name:  None,
    };
    assert!(handlers::invitations::accept_invitation_handler(&state, replay)
        .await
        .is_err());
}

// ---------------------------------------------------------------------------
// Registration and gate

#[tokio::test]
async fn registration_creates_trialing_org_with_owner() {
    let state = test_state().await;

    let req = server::dto::auth::RegisterRequest {
        organization_name: "Acme Rockets".to_string(),
        email:             "founder@acme.example".to_string(),
        password:          "CorrectHorse9!battery".to_string(),
        first_name:        Some("Fay".to_string()),
        last_name:         None,
    };

    let response = handlers::auth::register_handler(&state, req)
        .await
        .expect("registration must succeed");
    let payload = response.0.data.expect("auth payload");
    assert_eq!(payload.user.role, "org_owner");
    assert!(!payload.tokens.access_token.is_empty());

    let organization_id = payload.user.organization_id.expect("organization id");
    let org = gate::load_organization(&state.db, &organization_id).await.unwrap();
    assert_eq!(org.subscription_status, SubscriptionStatus::Trialing);
    assert_eq!(org.plan, Plan::Professional);
    assert_eq!(org.user_count, 1);
    assert_eq!(org.slug, "acme-rockets");

    let ends = org.trial_ends_at.expect("trial end date");
    let days = billing::trial_days_left(ends, Utc::now());
    assert_eq!(days, 14);

    // The trialing org passes the gate.
    let owner = identity(&payload.user.id, UserRole::OrgOwner, Some(&organization_id));
    assert!(gate::require_feature_access(&state, &owner).await.is_ok());
}

#[tokio::test]
async fn admin_setup_creates_org_and_owner_claims_it_by_token() {
    let state = test_state().await;
    let root = identity("usr_root", UserRole::SuperAdmin, None);

    let req = server::dto::organizations::CreateOrganizationRequest {
        name:        "Managed Tenant".to_string(),
        owner_email: "owner@managed.example".to_string(),
        plan:        None,
    };
    let response = handlers::organizations::create_organization_handler(&state, root, req)
        .await
        .expect("admin setup must succeed");
    let setup = response.0.data.expect("setup payload");
    assert_eq!(setup.organization.subscription_status, "trialing");
    assert!(setup.organization.owner_id.is_empty());
    assert_eq!(setup.invitation.role, "org_owner");

    // The token is only delivered over email; read it back from the store.
    let invitation = invitations::Entity::find_by_id(&setup.invitation.id)
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();

    let accept = server::dto::invitations::AcceptInvitationRequest {
        token:      invitation.token.clone(),
        password:   "CorrectHorse9!battery".to_string(),
        first_name: Some("Olive".to_string()),
        last_name:  None,
    };
    let accepted = handlers::invitations::accept_invitation_handler(&state, accept)
        .await
        .expect("owner invitation accept must succeed");
    let owner = accepted.0.data.expect("owner payload");
    assert_eq!(owner.role, "org_owner");

    let org = gate::load_organization(&state.db, &setup.organization.id)
        .await
        .unwrap();
    assert_eq!(org.owner_id, owner.id);
    assert_eq!(org.user_count, 1);
}

#[tokio::test]
async fn org_owner_cannot_run_admin_setup() {
    let state = test_state().await;
    insert_org(&state, "org_own", Plan::Business, SubscriptionStatus::Active, None, 1, 0).await;
    let owner = identity("usr_owner", UserRole::OrgOwner, Some("org_own"));

    let req = server::dto::organizations::CreateOrganizationRequest {
        name:        "Rogue Tenant".to_string(),
        owner_email: "rogue@example.com".to_string(),
        plan:        None,
    };
    let err = handlers::organizations::create_organization_handler(&state, owner, req)
        .await
        .expect_err("tenant owners must not create organizations");
    assert_eq!(err.code(), "FORBIDDEN");
}

// ---------------------------------------------------------------------------
// Billing webhooks

#[tokio::test]
async fn checkout_webhook_activates_trialing_org() {
    let state = test_state().await;
    insert_org(
        &state,
        "org_pay",
        Plan::Professional,
        SubscriptionStatus::Trialing,
        Some(Utc::now() + Duration::days(3)),
        1,
        0,
    )
    .await;

    let payload = serde_json::json!({
        "type": "checkout.session.completed",
        "data": {"object": {
            "customer": "cus_42",
            "subscription": "sub_42",
            "metadata": {"organization_id": "org_pay", "plan": "business"}
        }}
    })
    .to_string();

    handlers::billing::webhook_handler(&state, "", &payload)
        .await
        .expect("webhook must be accepted");

    let org = gate::load_organization(&state.db, "org_pay").await.unwrap();
    assert_eq!(org.subscription_status, SubscriptionStatus::Active);
    assert_eq!(org.plan, Plan::Business);
    assert_eq!(org.billing_customer_id.as_deref(), Some("cus_42"));
    assert_eq!(org.billing_subscription_id.as_deref(), Some("sub_42"));
    assert!(org.trial_ends_at.is_none());

    // Redelivery writes the same absolute state again.
    handlers::billing::webhook_handler(&state, "", &payload)
        .await
        .expect("redelivered webhook must be accepted");
    let again = gate::load_organization(&state.db, "org_pay").await.unwrap();
    assert_eq!(again.subscription_status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn invoice_webhooks_drive_past_due_and_back() {
    let state = test_state().await;
    insert_org(&state, "org_inv_cycle", Plan::Business, SubscriptionStatus::Active, None, 1, 0).await;

    let failed = serde_json::json!({
        "type": "invoice.payment_failed",
        "data": {"object": {
            "attempt_count": 1,
            "metadata": {"organization_id": "org_inv_cycle"}
        }}
    })
    .to_string();
    handlers::billing::webhook_handler(&state, "", &failed).await.unwrap();

    let org = gate::load_organization(&state.db, "org_inv_cycle").await.unwrap();
    assert_eq!(org.subscription_status, SubscriptionStatus::PastDue);
    assert!(!billing::can_access_features(&org, Utc::now()));

    let paid = serde_json::json!({
        "type": "invoice.paid",
        "data": {"object": {
            "amount_paid": 4900,
            "metadata": {"organization_id": "org_inv_cycle"}
        }}
    })
    .to_string();
    handlers::billing::webhook_handler(&state, "", &paid).await.unwrap();

    let restored = gate::load_organization(&state.db, "org_inv_cycle").await.unwrap();
    assert_eq!(restored.subscription_status, SubscriptionStatus::Active);

    // Events for organizations this deployment does not know are
    // acknowledged, not retried forever.
    let unknown = serde_json::json!({
        "type": "invoice.paid",
        "data": {"object": {"metadata": {"organization_id": "org_ghost"}}}
    })
    .to_string();
    assert!(handlers::billing::webhook_handler(&state, "", &unknown).await.is_ok());
}

#[tokio::test]
async fn past_due_org_is_gated_with_payment_required() {
    let state = test_state().await;
    insert_org(&state, "org_due", Plan::Professional, SubscriptionStatus::PastDue, None, 1, 0).await;
    insert_user(&state, "usr_due", "due@example.com", UserRole::OrgOwner, Some("org_due")).await;

    let owner = identity("usr_due", UserRole::OrgOwner, Some("org_due"));
    let err = gate::require_feature_access(&state, &owner)
        .await
        .expect_err("past-due org must be gated");
    assert_eq!(err.code(), "PAYMENT_REQUIRED");

    // Platform admins bypass the gate even on a past-due org.
    let mut root = identity("usr_root", UserRole::SuperAdmin, None);
    root.organization_id = Some("org_due".to_string());
    assert!(gate::require_feature_access(&state, &root).await.is_ok());
}
