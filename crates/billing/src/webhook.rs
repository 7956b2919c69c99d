//! Billing webhook handling
//!
//! Parses incoming billing provider webhook events into typed values. Every
//! event is keyed by the organization id carried in the event metadata, so
//! applying an event is idempotent per organization. Signature mechanics
//! are out of scope; when a shared secret is configured the header value is
//! compared in constant time.

use chrono::{DateTime, Utc};
use entity::organizations::{Plan, SubscriptionStatus};
use subtle::ConstantTimeEq;

use crate::BillingError;

/// Parsed billing webhook event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingWebhookEvent {
    /// Checkout session completed, subscription established
    CheckoutCompleted {
        organization_id: String,
        customer_id:     String,
        subscription_id: Option<String>,
        plan:            Plan,
    },

    /// Subscription was updated (plan change, status change, cancellation
    /// scheduling)
    SubscriptionUpdated {
        organization_id:      String,
        plan:                 Plan,
        status:               SubscriptionStatus,
        cancel_at_period_end: bool,
        trial_end:            Option<DateTime<Utc>>,
    },

    /// Subscription was deleted/canceled
    SubscriptionDeleted {
        organization_id: String,
    },

    /// Invoice was paid successfully
    InvoicePaid {
        organization_id: String,
        amount_paid:     i64,
    },

    /// Invoice payment failed
    InvoicePaymentFailed {
        organization_id: String,
        attempt_count:   i64,
    },

    /// Unknown or unhandled event
    Unknown {
        event_type: String,
    },
}

/// Parse a raw webhook payload into an event.
///
/// # Arguments
/// * `payload` - Raw webhook body
/// * `signature` - Value of the webhook signature header
/// * `webhook_secret` - Shared secret; empty disables the check
///
/// # Errors
///
/// Fails when the secret is configured and the header does not match, when
/// the payload is not JSON, or when a known event is missing its
/// organization id metadata.
pub fn parse_webhook_event(
    payload: &str,
    signature: &str,
    webhook_secret: &str,
) -> Result<BillingWebhookEvent, BillingError> {
    if !webhook_secret.is_empty() {
        let matches: bool = signature
            .as_bytes()
            .ct_eq(webhook_secret.as_bytes())
            .into();
        if !matches {
            return Err(BillingError::InvalidWebhook(
                "Webhook signature mismatch".into(),
            ));
        }
    }

    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| BillingError::InvalidWebhook(e.to_string()))?;

    let event_type = value["type"]
        .as_str()
        .ok_or_else(|| BillingError::InvalidWebhook("Missing event type".into()))?;

    let object = &value["data"]["object"];

    // Known events must carry the organization id in their metadata; it is
    // the idempotency key for applying the event.
    let organization_id = || -> Result<String, BillingError> {
        object["metadata"]["organization_id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                BillingError::InvalidWebhook(format!(
                    "Event '{}' is missing metadata.organization_id",
                    event_type
                ))
            })
    };

    match event_type {
        "checkout.session.completed" => {
            Ok(BillingWebhookEvent::CheckoutCompleted {
                organization_id: organization_id()?,
                customer_id:     object["customer"].as_str().unwrap_or("").to_string(),
                subscription_id: object["subscription"].as_str().map(|s| s.to_string()),
                plan:            parse_plan(object["metadata"]["plan"].as_str().unwrap_or("")),
            })
        },

        "customer.subscription.updated" => {
            Ok(BillingWebhookEvent::SubscriptionUpdated {
                organization_id:      organization_id()?,
                plan:                 parse_plan(object["metadata"]["plan"].as_str().unwrap_or("")),
                status:               SubscriptionStatus::from_provider(
                    object["status"].as_str().unwrap_or(""),
                ),
                cancel_at_period_end: object["cancel_at_period_end"].as_bool().unwrap_or(false),
                trial_end:            object["trial_end"]
                    .as_i64()
                    .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            })
        },

        "customer.subscription.deleted" => {
            Ok(BillingWebhookEvent::SubscriptionDeleted {
                organization_id: organization_id()?,
            })
        },

        "invoice.paid" => {
            Ok(BillingWebhookEvent::InvoicePaid {
                organization_id: organization_id()?,
                amount_paid:     object["amount_paid"].as_i64().unwrap_or(0),
            })
        },

        "invoice.payment_failed" => {
            Ok(BillingWebhookEvent::InvoicePaymentFailed {
                organization_id: organization_id()?,
                attempt_count:   object["attempt_count"].as_i64().unwrap_or(0),
            })
        },

        _ => {
            Ok(BillingWebhookEvent::Unknown {
                event_type: event_type.to_string(),
            })
        },
    }
}

/// Parse a plan from event metadata, defaulting to Free so an unknown plan
/// never grants paid features.
fn parse_plan(value: &str) -> Plan {
    Plan::from_string(value).unwrap_or_else(|| {
        if !value.is_empty() {
            tracing::warn!(plan = %value, "Unknown plan in webhook metadata, defaulting to free");
        }
        Plan::Free
    })
}
