//! # Identity Resolver Middleware
//!
//! Resolves the bearer credential on each request to an immutable
//! [`Identity`] and stores it in the request extensions. The
//! `access_token` cookie takes precedence over the Authorization header.
//!
//! Two variants exist:
//! - [`auth_middleware`] rejects the request with 401 when resolution
//!   fails for any reason
//! - [`optional_auth_middleware`] never fails; any error silently yields
//!   "no identity"

use std::collections::HashSet;

use auth::{extract_bearer_token, validate_token, Identity};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use entity::{team_managers, users};
use error::{AppError, Result};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::AppState;

/// Access token cookie name.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Mandatory authentication middleware.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_token(&request);
    let identity = match resolve_identity(&state, token).await {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Optional authentication middleware.
///
/// Identical resolution logic, but every failure is swallowed: the request
/// proceeds without an identity in its extensions.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_token(&request);
    if let Ok(identity) = resolve_identity(&state, token).await {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}

/// Resolve the request credential to an identity.
///
/// Read-only: looks up the user and their managed-team set, but writes
/// nothing.
async fn resolve_identity(state: &AppState, token: Option<String>) -> Result<Identity> {
    let token =
        token.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let claims = validate_token(&state.jwt_config, &token)?;

    let user = users::Entity::find_by_id(&claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

    if user.deleted_at.is_some() || !user.is_active {
        return Err(AppError::unauthorized("Account is not active"));
    }

    let managed_team_ids: HashSet<String> = team_managers::Entity::find()
        .filter(team_managers::Column::UserId.eq(&user.id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|assignment| assignment.team_id)
        .collect();

    Ok(Identity {
        id: user.id,
        email: user.email,
        role: user.role,
        organization_id: user.organization_id,
        managed_team_ids,
    })
}

/// Extract the access token: cookie first, then the Authorization header.
fn extract_token(request: &Request) -> Option<String> {
    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookies) = cookie_header.to_str() {
            if let Some(token) = cookie_value(cookies, ACCESS_TOKEN_COOKIE) {
                return Some(token);
            }
        }
    }

    let auth_header = request.headers().get(header::AUTHORIZATION)?;
    extract_bearer_token(auth_header.to_str().ok()?)
}

/// Pull a named value out of a Cookie header.
fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name && !value.is_empty() {
            Some(value.to_string())
        }
        else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value_single() {
        assert_eq!(
            cookie_value("access_token=abc123", "access_token"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_cookie_value_multiple() {
        let cookies = "theme=dark; access_token=tok; locale=en";
        assert_eq!(cookie_value(cookies, "access_token"), Some("tok".to_string()));
        assert_eq!(cookie_value(cookies, "theme"), Some("dark".to_string()));
    }

    #[test]
    fn test_cookie_value_missing_or_empty() {
        assert_eq!(cookie_value("theme=dark", "access_token"), None);
        assert_eq!(cookie_value("access_token=", "access_token"), None);
        assert_eq!(cookie_value("", "access_token"), None);
    }

    #[test]
    fn test_cookie_takes_precedence() {
        let request = Request::builder()
            .header(header::COOKIE, "access_token=cookie-token")
            .header(header::AUTHORIZATION, "Bearer header-token")
            .body(axum::body::Body::empty())
            .unwrap();

        assert_eq!(extract_token(&request), Some("cookie-token".to_string()));
    }

    #[test]
    fn test_header_fallback() {
        let request = Request::builder()
            .header(header::AUTHORIZATION, "Bearer header-token")
            .body(axum::body::Body::empty())
            .unwrap();

        assert_eq!(extract_token(&request), Some("header-token".to_string()));
    }

    #[test]
    fn test_no_token() {
        let request = Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();

        assert_eq!(extract_token(&request), None);
    }
}
