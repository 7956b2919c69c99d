//! # Tenant Context Injector
//!
//! Derives the active organization id from the resolved identity and makes
//! it available to tenant-scoped handlers. Platform admins are NOT exempt
//! here: tenant context exists only for tenant-scoped resources, and the
//! platform-admin bypass belongs to the guard layer upstream.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use auth::Identity;
use error::{AppError, Result};

/// The active organization for a tenant-scoped request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext(pub String);

impl TenantContext {
    #[must_use]
    pub fn organization_id(&self) -> &str { &self.0 }
}

/// Mandatory tenant context middleware.
///
/// Requires an identity resolved upstream; fails with 400 when the
/// identity has no organization.
pub async fn tenant_middleware(mut request: Request, next: Next) -> Response {
    let context = match derive_context(&request) {
        Ok(context) => context,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Optional tenant context middleware: never fails, simply omits the
/// context when unavailable.
pub async fn optional_tenant_middleware(mut request: Request, next: Next) -> Response {
    if let Ok(context) = derive_context(&request) {
        request.extensions_mut().insert(context);
    }
    next.run(request).await
}

fn derive_context(request: &Request) -> Result<TenantContext> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    identity
        .organization_id
        .clone()
        .map(TenantContext)
        .ok_or_else(|| AppError::bad_request("User does not belong to an organization"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use entity::users::UserRole;

    use super::*;

    fn request_with_identity(organization_id: Option<&str>) -> Request {
        let mut request = Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        request.extensions_mut().insert(Identity {
            id:               "usr_1".to_string(),
            email:            "u@example.com".to_string(),
            role:             UserRole::OrgMember,
            organization_id:  organization_id.map(|s| s.to_string()),
            managed_team_ids: HashSet::new(),
        });
        request
    }

    #[test]
    fn test_derive_context_with_org() {
        let request = request_with_identity(Some("org_1"));
        let context = derive_context(&request).unwrap();
        assert_eq!(context.organization_id(), "org_1");
    }

    #[test]
    fn test_derive_context_without_org_is_bad_request() {
        let request = request_with_identity(None);
        let err = derive_context(&request).unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn test_derive_context_without_identity_is_unauthorized() {
        let request = Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        let err = derive_context(&request).unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[test]
    fn test_platform_admin_is_not_exempt() {
        // A platform admin with no organization still gets no tenant
        // context; the bypass lives in the guard layer, not here.
        let mut request = Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        request.extensions_mut().insert(Identity {
            id:               "usr_root".to_string(),
            email:            "root@example.com".to_string(),
            role:             UserRole::SuperAdmin,
            organization_id:  None,
            managed_team_ids: HashSet::new(),
        });

        assert!(derive_context(&request).is_err());
    }
}
