//! # User Data Transfer Objects

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a user inside the caller's organization.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email:      String,
    #[validate(length(min = 12, message = "Password must be at least 12 characters"))]
    pub password:   String,
    /// Role for the new user (org_owner, org_admin, org_member)
    #[validate(length(min = 1, message = "Role is required"))]
    pub role:       String,
    pub first_name: Option<String>,
    pub last_name:  Option<String>,
}

/// Request to update a user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name:  Option<String>,
    /// New role (org_owner, org_admin, org_member)
    pub role:       Option<String>,
    /// Activate or deactivate the account
    pub is_active:  Option<bool>,
}

/// Response for a single user.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id:                   String,
    pub email:                String,
    pub first_name:           Option<String>,
    pub last_name:            Option<String>,
    pub role:                 String,
    pub organization_id:      Option<String>,
    pub is_active:            bool,
    pub must_change_password: bool,
    pub last_login_at:        Option<String>,
    pub created_at:           String,
}

impl UserResponse {
    /// Convert a user entity into the response shape.
    pub fn from_model(user: &entity::users::Model) -> Self {
        Self {
            id:                   user.id.clone(),
            email:                user.email.clone(),
            first_name:           user.first_name.clone(),
            last_name:            user.last_name.clone(),
            role:                 user.role.to_string(),
            organization_id:      user.organization_id.clone(),
            is_active:            user.is_active,
            must_change_password: user.must_change_password,
            last_login_at:        user.last_login_at.map(|t| t.to_rfc3339()),
            created_at:           user.created_at.to_rfc3339(),
        }
    }
}
