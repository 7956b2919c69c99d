//! # Organization Data Transfer Objects

use billing::PlanLimits;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request for platform-admin-initiated organization setup.
///
/// Creates the tenant and an owner invitation; the owner account itself is
/// created when the invitation token is accepted.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Organization name must be between 1 and 255 characters"
    ))]
    pub name:        String,
    /// Email address the owner invitation is sent to
    #[validate(email(message = "A valid owner email address is required"))]
    pub owner_email: String,
    /// Initial plan (defaults to a professional trial)
    pub plan:        Option<String>,
}

/// Result of admin-initiated setup: the organization plus the pending
/// owner invitation.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationSetupResponse {
    pub organization: OrganizationResponse,
    pub invitation:   super::invitations::InvitationResponse,
}

/// Request to update an organization.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Organization name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
}

/// Request to change an organization's plan.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePlanRequest {
    /// Target plan (free, professional, business, enterprise)
    #[validate(length(min = 1, message = "Plan is required"))]
    pub plan: String,
}

/// Usage counters alongside the plan-derived limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub users:     i32,
    pub teams:     i32,
    pub max_users: i32,
    pub max_teams: i32,
}

/// Response for a single organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationResponse {
    pub id:                   String,
    pub name:                 String,
    pub slug:                 String,
    pub plan:                 String,
    pub subscription_status:  String,
    pub trial_ends_at:        Option<String>,
    pub owner_id:             String,
    pub usage:                UsageResponse,
    pub cancel_at_period_end: bool,
    pub is_active:            bool,
    pub created_at:           String,
}

impl OrganizationResponse {
    /// Convert an organization entity into the response shape, deriving
    /// the limits from the plan.
    pub fn from_model(org: &entity::organizations::Model) -> Self {
        let limits = PlanLimits::for_plan(org.plan);
        Self {
            id:                   org.id.clone(),
            name:                 org.name.clone(),
            slug:                 org.slug.clone(),
            plan:                 org.plan.to_string(),
            subscription_status:  org.subscription_status.to_string(),
            trial_ends_at:        org.trial_ends_at.map(|t| t.to_rfc3339()),
            owner_id:             org.owner_id.clone(),
            usage:                UsageResponse {
                users:     org.user_count,
                teams:     org.team_count,
                max_users: limits.max_users,
                max_teams: limits.max_teams,
            },
            cancel_at_period_end: org.cancel_at_period_end,
            is_active:            org.is_active,
            created_at:           org.created_at.to_rfc3339(),
        }
    }
}
