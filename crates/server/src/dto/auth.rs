//! # Authentication Data Transfer Objects

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to register a new organization with its owner account.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Organization display name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Organization name must be between 1 and 255 characters"
    ))]
    pub organization_name: String,
    /// Owner email address
    #[validate(email(message = "A valid email address is required"))]
    pub email:             String,
    /// Owner password
    #[validate(length(min = 12, message = "Password must be at least 12 characters"))]
    pub password:          String,
    /// Owner first name
    pub first_name:        Option<String>,
    /// Owner last name
    pub last_name:         Option<String>,
}

/// Request to log in.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email:    String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request to rotate a refresh token.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Request to change the caller's password.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 12, message = "Password must be at least 12 characters"))]
    pub new_password:     String,
}

/// Token pair issued on successful authentication.
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    /// Short-lived JWT access token
    pub access_token:  String,
    /// Long-lived opaque refresh token
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in:    u64,
    /// Token type for the Authorization header
    pub token_type:    String,
}

/// Authenticated user summary returned by auth endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUserResponse {
    pub id:              String,
    pub email:           String,
    pub display_name:    String,
    pub role:            String,
    pub organization_id: Option<String>,
}

/// Payload for successful login/register/refresh.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSuccess {
    pub user:   AuthenticatedUserResponse,
    pub tokens: AuthTokens,
}
