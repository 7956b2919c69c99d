//! # JWT Token Management
//!
//! JWT access token generation and validation for API authentication.

use std::{
    collections::HashSet,
    time::{Duration, SystemTime},
};

use entity::users::UserRole;
use error::AppError;
use error::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT signing and validation configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Base64-encoded signing secret
    pub secret:             String,
    /// Access token lifetime in seconds
    pub expiration_seconds: u64,
    /// Token issuer
    pub issuer:             String,
    /// Token audience
    pub audience:           String,
}

impl JwtConfig {
    /// Load the configuration from environment variables.
    pub fn from_env() -> error::Result<Self> {
        Ok(Self {
            secret:             std::env::var("MERIDIAN_JWT_SECRET")
                .map_err(|_| AppError::config("MERIDIAN_JWT_SECRET is not set"))?,
            expiration_seconds: std::env::var("MERIDIAN_JWT_EXPIRATION_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
            issuer:             std::env::var("MERIDIAN_JWT_ISSUER").unwrap_or_else(|_| "meridian".to_string()),
            audience:           std::env::var("MERIDIAN_JWT_AUDIENCE")
                .unwrap_or_else(|_| "meridian-api".to_string()),
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// User email
    pub email: String,

    /// User role
    pub role: UserRole,

    /// Organization the user belongs to, absent for platform admins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    /// Token issuer
    pub iss: String,

    /// Token audience
    pub aud: String,

    /// Expiration time (Unix timestamp)
    pub exp: u64,

    /// Issued at (Unix timestamp)
    pub iat: u64,

    /// Unique token ID
    pub jti: String,
}

/// Creates a new JWT access token for a user.
///
/// # Errors
///
/// Returns an error if the secret is invalid or token encoding fails.
pub fn create_access_token(
    config: &JwtConfig,
    user_id: &str,
    email: &str,
    role: UserRole,
    organization_id: Option<&str>,
) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_err(|e| AppError::internal(format!("Failed to get current time: {}", e)))?;

    let issued_at = now.as_secs();
    let expiration = now + Duration::from_secs(config.expiration_seconds);

    let claims = Claims {
        sub:   user_id.to_string(),
        email: email.to_string(),
        role,
        org:   organization_id.map(|s| s.to_string()),
        iss:   config.issuer.clone(),
        aud:   config.audience.clone(),
        exp:   expiration.as_secs(),
        iat:   issued_at,
        jti:   cuid2::create_id(),
    };

    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_base64_secret(&config.secret)
            .map_err(|e| AppError::config(format!("Invalid JWT secret: {}", e)))?,
    )
    .map_err(|e| AppError::internal(format!("Failed to encode token: {}", e)))?;

    Ok(token)
}

/// Validates a JWT token and returns the claims.
///
/// # Errors
///
/// Returns `JwtExpired` for expired tokens and `JwtInvalidToken` for any
/// other validation failure.
pub fn validate_token(config: &JwtConfig, token: &str) -> Result<Claims> {
    let decoding_key = DecodingKey::from_base64_secret(&config.secret)
        .map_err(|e| AppError::config(format!("Invalid JWT secret: {}", e)))?;

    let mut validation = Validation::default();
    validation.iss = Some(HashSet::from([config.issuer.clone()]));
    validation.aud = Some(HashSet::from([config.audience.clone()]));
    validation.validate_exp = true;

    let data = jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::JwtExpired,
            _ => AppError::JwtInvalidToken,
        }
    })?;

    Ok(data.claims)
}

/// Extracts the Bearer token from an Authorization header value.
pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
    if !auth_header.starts_with("Bearer ") {
        return None;
    }

    let token = auth_header.trim_start_matches("Bearer ").trim();

    if token.is_empty() {
        return None;
    }

    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use base64::Engine;

    use super::*;

    fn test_config() -> JwtConfig {
        let secret = "test-secret-key-that-is-at-least-32-bytes-long";
        JwtConfig {
            secret:             base64::engine::general_purpose::STANDARD.encode(secret),
            expiration_seconds: 3600,
            issuer:             "meridian-test".to_string(),
            audience:           "meridian-test-api".to_string(),
        }
    }

    #[test]
    fn test_create_and_validate_token() {
        let config = test_config();

        let token = create_access_token(
            &config,
            "usr_123",
            "owner@example.com",
            UserRole::OrgOwner,
            Some("org_456"),
        )
        .expect("Failed to create token");

        assert!(!token.is_empty());

        let claims = validate_token(&config, &token).expect("Failed to validate token");

        assert_eq!(claims.sub, "usr_123");
        assert_eq!(claims.email, "owner@example.com");
        assert_eq!(claims.role, UserRole::OrgOwner);
        assert_eq!(claims.org.as_deref(), Some("org_456"));
        assert_eq!(claims.iss, "meridian-test");
    }

    #[test]
    fn test_platform_admin_token_has_no_org() {
        let config = test_config();
        let token = create_access_token(
            &config,
            "usr_root",
            "root@example.com",
            UserRole::SuperAdmin,
            None,
        )
        .unwrap();

        let claims = validate_token(&config, &token).unwrap();
        assert!(claims.org.is_none());
        assert_eq!(claims.role, UserRole::SuperAdmin);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let config = test_config();
        let token = create_access_token(
            &config,
            "usr_123",
            "a@example.com",
            UserRole::OrgMember,
            Some("org_1"),
        )
        .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('x');

        let result = validate_token(&config, &tampered);
        assert!(matches!(result, Err(AppError::JwtInvalidToken)));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            extract_bearer_token("Bearer abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_bearer_token("Bearer   abc123   "),
            Some("abc123".to_string())
        );
        assert!(extract_bearer_token("Basic abc123").is_none());
        assert!(extract_bearer_token("Bearer").is_none());
        assert!(extract_bearer_token("").is_none());
    }
}
