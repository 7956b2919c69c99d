//! # Billing Integration
//!
//! Billing building blocks for the Meridian platform:
//! - the plan→limits lookup table
//! - the trial/subscription access gate and quota predicates
//! - a provider abstraction for checkout/portal/cancel/resume
//! - webhook event parsing
//!
//! The billing provider itself is a black box behind [`BillingService`];
//! a logging stub stands in during development and tests.

pub mod access;
pub mod plan;
pub mod webhook;

use async_trait::async_trait;
use thiserror::Error;

pub use access::{can_access_features, can_add_team, can_add_user, trial_days_left};
pub use plan::PlanLimits;
pub use webhook::{parse_webhook_event, BillingWebhookEvent};

/// Billing service errors
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Billing provider error: {0}")]
    Provider(String),

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Invalid webhook payload: {0}")]
    InvalidWebhook(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Configuration for the billing service
#[derive(Clone)]
pub struct BillingConfig {
    /// API secret key for the billing provider
    pub api_key: String,

    /// Shared secret for webhook authentication
    pub webhook_secret: String,

    /// Trial period in days for new organizations
    pub trial_days: u32,
}

impl BillingConfig {
    /// Create a billing configuration from environment variables.
    pub fn from_env() -> Result<Self, BillingError> {
        Ok(Self {
            api_key: std::env::var("MERIDIAN_BILLING_API_KEY")
                .map_err(|_| BillingError::Config("MERIDIAN_BILLING_API_KEY not set".into()))?,
            webhook_secret: std::env::var("MERIDIAN_BILLING_WEBHOOK_SECRET").unwrap_or_default(),
            trial_days: match std::env::var("MERIDIAN_BILLING_TRIAL_DAYS") {
                Ok(v) => {
                    v.parse().map_err(|_| {
                        BillingError::Config(format!(
                            "Invalid MERIDIAN_BILLING_TRIAL_DAYS value '{}': expected a number",
                            v
                        ))
                    })?
                },
                Err(_) => 14,
            },
        })
    }

    /// Create a test configuration (for development/testing)
    pub fn test() -> Self {
        Self {
            api_key:        "test_api_key".into(),
            webhook_secret: String::new(),
            trial_days:     14,
        }
    }
}

/// Result of creating a checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Session ID
    pub session_id: String,

    /// URL to redirect the user to for payment
    pub checkout_url: String,
}

/// Result of creating a billing portal session
#[derive(Debug, Clone)]
pub struct PortalSession {
    /// URL to redirect the user to the billing portal
    pub portal_url: String,
}

/// Billing provider trait for dependency injection
#[async_trait]
pub trait BillingService: Send + Sync {
    /// Create or return the billing customer id for an organization
    async fn ensure_customer(
        &self,
        organization_id: &str,
        email: &str,
        name: &str,
    ) -> Result<String, BillingError>;

    /// Create a checkout session for upgrading to a paid plan
    async fn create_checkout_session(
        &self,
        organization_id: &str,
        customer_id: &str,
        plan: entity::organizations::Plan,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, BillingError>;

    /// Create a billing portal session for managing the subscription
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError>;

    /// Cancel a subscription at period end
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), BillingError>;

    /// Resume a subscription scheduled for cancellation
    async fn resume_subscription(&self, subscription_id: &str) -> Result<(), BillingError>;
}

/// Logging stub standing in for the real billing provider.
///
/// Checkout redirects straight to the success URL; subscription state is
/// driven entirely by webhook events in development.
pub struct StubBillingService;

#[async_trait]
impl BillingService for StubBillingService {
    async fn ensure_customer(
        &self,
        organization_id: &str,
        _email: &str,
        _name: &str,
    ) -> Result<String, BillingError> {
        let customer_id = format!("cus_stub_{}", cuid2::create_id());
        tracing::info!(organization_id = %organization_id, customer_id = %customer_id, "Stub billing customer created");
        Ok(customer_id)
    }

    async fn create_checkout_session(
        &self,
        organization_id: &str,
        _customer_id: &str,
        plan: entity::organizations::Plan,
        success_url: &str,
        _cancel_url: &str,
    ) -> Result<CheckoutSession, BillingError> {
        let session_id = format!("cs_stub_{}", cuid2::create_id());
        let checkout_url = format!("{}?session_id={}", success_url, session_id);

        tracing::info!(
            organization_id = %organization_id,
            plan = %plan,
            session_id = %session_id,
            "Stub checkout session created"
        );

        Ok(CheckoutSession {
            session_id,
            checkout_url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        tracing::info!(customer_id = %customer_id, "Stub portal session created");
        Ok(PortalSession {
            portal_url: return_url.to_string(),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), BillingError> {
        tracing::info!(subscription_id = %subscription_id, "Stub subscription canceled at period end");
        Ok(())
    }

    async fn resume_subscription(&self, subscription_id: &str) -> Result<(), BillingError> {
        tracing::info!(subscription_id = %subscription_id, "Stub subscription resumed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_config_test_defaults() {
        let config = BillingConfig::test();
        assert_eq!(config.trial_days, 14);
        assert!(config.webhook_secret.is_empty());
    }

    #[tokio::test]
    async fn test_stub_checkout_redirects_to_success_url() {
        let service = StubBillingService;
        let session = service
            .create_checkout_session(
                "org_1",
                "cus_1",
                entity::organizations::Plan::Professional,
                "https://app.example.com/billing/success",
                "https://app.example.com/billing/cancel",
            )
            .await
            .unwrap();

        assert!(session
            .checkout_url
            .starts_with("https://app.example.com/billing/success?session_id="));
        assert!(session.session_id.starts_with("cs_stub_"));
    }

    #[tokio::test]
    async fn test_stub_customer_ids_are_unique() {
        let service = StubBillingService;
        let a = service.ensure_customer("org_1", "a@x.com", "A").await.unwrap();
        let b = service.ensure_customer("org_1", "a@x.com", "A").await.unwrap();
        assert_ne!(a, b);
    }
}
