//! # Invitation Data Transfer Objects

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to invite someone into the caller's organization.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email:   String,
    /// Role the created user will receive (org_owner, org_admin, org_member)
    #[validate(length(min = 1, message = "Role is required"))]
    pub role:    String,
    /// Optional team the user joins on acceptance
    pub team_id: Option<String>,
}

/// Request to accept an invitation (public, token-based).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AcceptInvitationRequest {
    #[validate(length(min = 1, message = "Invitation token is required"))]
    pub token:      String,
    #[validate(length(min = 12, message = "Password must be at least 12 characters"))]
    pub password:   String,
    pub first_name: Option<String>,
    pub last_name:  Option<String>,
}

/// Response for a single invitation.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationResponse {
    pub id:              String,
    pub organization_id: String,
    pub team_id:         Option<String>,
    pub email:           String,
    pub role:            String,
    pub status:          String,
    pub invited_by:      String,
    pub expires_at:      String,
    pub created_at:      String,
}

impl InvitationResponse {
    /// Convert an invitation entity into the response shape. The token is
    /// deliberately absent: it is only ever delivered over email.
    pub fn from_model(invitation: &entity::invitations::Model) -> Self {
        Self {
            id:              invitation.id.clone(),
            organization_id: invitation.organization_id.clone(),
            team_id:         invitation.team_id.clone(),
            email:           invitation.email.clone(),
            role:            invitation.role.to_string(),
            status:          invitation.status.to_string(),
            invited_by:      invitation.invited_by.clone(),
            expires_at:      invitation.expires_at.to_rfc3339(),
            created_at:      invitation.created_at.to_rfc3339(),
        }
    }
}
