//! # Billing Data Transfer Objects

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to start a checkout session for a plan upgrade.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCheckoutRequest {
    /// Target plan (professional, business, enterprise)
    #[validate(length(min = 1, message = "Plan is required"))]
    pub plan:        String,
    #[validate(url(message = "A valid success URL is required"))]
    pub success_url: String,
    #[validate(url(message = "A valid cancel URL is required"))]
    pub cancel_url:  String,
}

/// Request for a customer portal session.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePortalRequest {
    #[validate(url(message = "A valid return URL is required"))]
    pub return_url: String,
}

/// Checkout session response.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub session_id:   String,
    pub checkout_url: String,
}

/// Portal session response.
#[derive(Debug, Clone, Serialize)]
pub struct PortalResponse {
    pub portal_url: String,
}
