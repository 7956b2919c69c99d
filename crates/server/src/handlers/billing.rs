//! # Billing Handlers
//!
//! Checkout, portal, cancel/reactivate and the provider webhook. Webhook
//! events update subscription fields with absolute writes keyed by the
//! organization id in the event metadata, so redelivered events are
//! harmless.

use auth::{
    rbac::{BillingAction, Permission},
    Identity,
};
use axum::Json;
use billing::BillingWebhookEvent;
use chrono::Utc;
use entity::organizations::{self, Plan, SubscriptionStatus};
use error::{ApiResponse, AppError, Result};
use permissions_macro::with_permission;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    cache::{organization_key, Cache},
    dto::billing::{
        CheckoutResponse,
        CreateCheckoutRequest,
        CreatePortalRequest,
        PortalResponse,
    },
    gate,
    middleware::tenant::TenantContext,
    AppState,
};

/// Start a checkout session for a plan upgrade.
#[with_permission(Permission::Billing(BillingAction::Manage))]
pub async fn create_checkout_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    req: CreateCheckoutRequest,
) -> Result<Json<ApiResponse<CheckoutResponse>>> {
    req.validate()?;

    let plan = Plan::from_string(&req.plan)
        .filter(|plan| *plan != Plan::Free)
        .ok_or_else(|| {
            AppError::bad_request("Invalid plan. Must be one of: professional, business, enterprise")
        })?;

    let org = gate::load_organization(&state.db, tenant.organization_id()).await?;

    let customer_id = match org.billing_customer_id.clone() {
        Some(customer_id) => customer_id,
        None => {
            let customer_id = state
                .billing
                .ensure_customer(&org.id, &identity.email, &org.name)
                .await
                .map_err(|e| AppError::internal(format!("Billing provider error: {}", e)))?;

            let mut active: organizations::ActiveModel = org.clone().into();
            active.billing_customer_id = Set(Some(customer_id.clone()));
            active.updated_at = Set(Utc::now());
            active.update(&state.db).await?;

            customer_id
        },
    };

    let session = state
        .billing
        .create_checkout_session(&org.id, &customer_id, plan, &req.success_url, &req.cancel_url)
        .await
        .map_err(|e| AppError::internal(format!("Billing provider error: {}", e)))?;

    info!(organization_id = %org.id, plan = %plan, user_id = %identity.id, "Checkout session created");

    Ok(Json(ApiResponse::ok(
        "Checkout session created",
        CheckoutResponse {
            session_id:   session.session_id,
            checkout_url: session.checkout_url,
        },
    )))
}

/// Open the customer portal for subscription management.
#[with_permission(Permission::Billing(BillingAction::Manage))]
pub async fn create_portal_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
    req: CreatePortalRequest,
) -> Result<Json<ApiResponse<PortalResponse>>> {
    req.validate()?;

    let org = gate::load_organization(&state.db, tenant.organization_id()).await?;

    let customer_id = org
        .billing_customer_id
        .ok_or_else(|| AppError::bad_request("Organization has no billing account yet"))?;

    let session = state
        .billing
        .create_portal_session(&customer_id, &req.return_url)
        .await
        .map_err(|e| AppError::internal(format!("Billing provider error: {}", e)))?;

    Ok(Json(ApiResponse::ok(
        "Portal session created",
        PortalResponse {
            portal_url: session.portal_url,
        },
    )))
}

/// Schedule the subscription for cancellation at period end.
#[with_permission(Permission::Billing(BillingAction::Manage))]
pub async fn cancel_subscription_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
) -> Result<Json<ApiResponse<()>>> {
    let org = gate::load_organization(&state.db, tenant.organization_id()).await?;

    let subscription_id = org
        .billing_subscription_id
        .clone()
        .ok_or_else(|| AppError::bad_request("Organization has no active subscription"))?;

    state
        .billing
        .cancel_subscription(&subscription_id)
        .await
        .map_err(|e| AppError::internal(format!("Billing provider error: {}", e)))?;

    let mut active: organizations::ActiveModel = org.into();
    active.cancel_at_period_end = Set(true);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    invalidate_snapshot(state, tenant.organization_id()).await;

    info!(organization_id = %tenant.organization_id(), user_id = %identity.id, "Subscription cancellation scheduled");

    Ok(Json(ApiResponse::message(
        "Subscription will cancel at the end of the current period",
    )))
}

/// Reactivate a subscription that was scheduled for cancellation or has
/// lapsed.
#[with_permission(Permission::Billing(BillingAction::Manage))]
pub async fn reactivate_subscription_handler(
    state: &AppState,
    identity: Identity,
    tenant: TenantContext,
) -> Result<Json<ApiResponse<()>>> {
    let org = gate::load_organization(&state.db, tenant.organization_id()).await?;

    let subscription_id = org
        .billing_subscription_id
        .clone()
        .ok_or_else(|| AppError::bad_request("Organization has no subscription to reactivate"))?;

    state
        .billing
        .resume_subscription(&subscription_id)
        .await
        .map_err(|e| AppError::internal(format!("Billing provider error: {}", e)))?;

    let mut active: organizations::ActiveModel = org.into();
    active.cancel_at_period_end = Set(false);
    active.subscription_status = Set(SubscriptionStatus::Active);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    invalidate_snapshot(state, tenant.organization_id()).await;

    info!(organization_id = %tenant.organization_id(), user_id = %identity.id, "Subscription reactivated");

    Ok(Json(ApiResponse::message("Subscription reactivated")))
}

/// Handle a billing provider webhook delivery (public endpoint).
pub async fn webhook_handler(
    state: &AppState,
    signature: &str,
    payload: &str,
) -> Result<Json<ApiResponse<()>>> {
    let event = billing::parse_webhook_event(
        payload,
        signature,
        &state.billing_config.webhook_secret,
    )
    .map_err(|e| AppError::bad_request(e.to_string()))?;

    match event {
        BillingWebhookEvent::CheckoutCompleted {
            organization_id,
            customer_id,
            subscription_id,
            plan,
        } => {
            apply_subscription_update(state, &organization_id, |active| {
                active.billing_customer_id = Set(Some(customer_id.clone()));
                active.billing_subscription_id = Set(subscription_id.clone());
                active.plan = Set(plan);
                active.subscription_status = Set(SubscriptionStatus::Active);
                active.trial_ends_at = Set(None);
                active.cancel_at_period_end = Set(false);
            })
            .await?;
            info!(organization_id = %organization_id, "Checkout completed, subscription active");
        },

        BillingWebhookEvent::SubscriptionUpdated {
            organization_id,
            plan,
            status,
            cancel_at_period_end,
            trial_end,
        } => {
            apply_subscription_update(state, &organization_id, |active| {
                active.plan = Set(plan);
                active.subscription_status = Set(status);
                active.cancel_at_period_end = Set(cancel_at_period_end);
                active.trial_ends_at = Set(trial_end);
            })
            .await?;
            info!(organization_id = %organization_id, status = %status, "Subscription updated");
        },

        BillingWebhookEvent::SubscriptionDeleted {
            organization_id,
        } => {
            apply_subscription_update(state, &organization_id, |active| {
                active.subscription_status = Set(SubscriptionStatus::Canceled);
                active.plan = Set(Plan::Free);
                active.billing_subscription_id = Set(None);
                active.cancel_at_period_end = Set(false);
            })
            .await?;
            info!(organization_id = %organization_id, "Subscription deleted, downgraded to free");
        },

        BillingWebhookEvent::InvoicePaid {
            organization_id,
            amount_paid,
        } => {
            apply_subscription_update(state, &organization_id, |active| {
                active.subscription_status = Set(SubscriptionStatus::Active);
            })
            .await?;
            info!(organization_id = %organization_id, amount_paid, "Invoice paid");
        },

        BillingWebhookEvent::InvoicePaymentFailed {
            organization_id,
            attempt_count,
        } => {
            apply_subscription_update(state, &organization_id, |active| {
                active.subscription_status = Set(SubscriptionStatus::PastDue);
            })
            .await?;
            warn!(organization_id = %organization_id, attempt_count, "Invoice payment failed, subscription past due");
        },

        BillingWebhookEvent::Unknown {
            event_type,
        } => {
            info!(event_type = %event_type, "Unhandled webhook event type");
        },
    }

    Ok(Json(ApiResponse::message("Webhook processed")))
}

/// Apply a mutation to an organization's subscription fields.
///
/// An unknown organization is logged and acknowledged rather than failed,
/// so the provider does not retry an event this deployment cannot use.
async fn apply_subscription_update<F>(
    state: &AppState,
    organization_id: &str,
    mutate: F,
) -> Result<()>
where
    F: FnOnce(&mut organizations::ActiveModel),
{
    let Some(org) = organizations::Entity::find_by_id(organization_id)
        .one(&state.db)
        .await?
    else {
        warn!(organization_id = %organization_id, "Webhook event for unknown organization");
        return Ok(());
    };

    let mut active: organizations::ActiveModel = org.into();
    mutate(&mut active);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    invalidate_snapshot(state, organization_id).await;

    Ok(())
}

async fn invalidate_snapshot(state: &AppState, organization_id: &str) {
    Cache::new(state.redis.clone())
        .delete(&organization_key(organization_id))
        .await;
}
