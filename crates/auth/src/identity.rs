//! # Request Identity
//!
//! The immutable identity value produced by the identity resolver and
//! threaded through every guard call. Guards never mutate it and never
//! read authorization state from anywhere else.

use std::collections::HashSet;

use entity::users::UserRole;

/// Resolved identity for one request.
#[derive(Debug, Clone)]
pub struct Identity {
    /// User ID
    pub id:               String,
    /// User email
    pub email:            String,
    /// Canonical role
    pub role:             UserRole,
    /// Organization the user belongs to; absent for platform admins
    pub organization_id:  Option<String>,
    /// Teams this user directly manages (beyond `manager_id` assignments)
    pub managed_team_ids: HashSet<String>,
}

impl Identity {
    /// Whether this identity bypasses all tenant-scoped checks.
    ///
    /// SuperAdmin always qualifies; Admin only when not bound to an
    /// organization (an org-bound Admin is a tenant user).
    #[must_use]
    pub fn is_platform_admin(&self) -> bool {
        match self.role {
            UserRole::SuperAdmin => true,
            UserRole::Admin => self.organization_id.is_none(),
            _ => false,
        }
    }

    /// Whether this identity administers its own organization.
    #[must_use]
    pub fn is_org_admin(&self) -> bool {
        matches!(self.role, UserRole::OrgOwner | UserRole::OrgAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: UserRole, organization_id: Option<&str>) -> Identity {
        Identity {
            id:               "usr_1".to_string(),
            email:            "u@example.com".to_string(),
            role,
            organization_id:  organization_id.map(|s| s.to_string()),
            managed_team_ids: HashSet::new(),
        }
    }

    #[test]
    fn test_super_admin_is_platform_admin() {
        assert!(identity(UserRole::SuperAdmin, None).is_platform_admin());
        // even an org-bound super admin bypasses tenant checks
        assert!(identity(UserRole::SuperAdmin, Some("org_1")).is_platform_admin());
    }

    #[test]
    fn test_admin_is_platform_admin_only_without_org() {
        assert!(identity(UserRole::Admin, None).is_platform_admin());
        assert!(!identity(UserRole::Admin, Some("org_1")).is_platform_admin());
    }

    #[test]
    fn test_org_roles_are_not_platform_admin() {
        for role in [UserRole::OrgOwner, UserRole::OrgAdmin, UserRole::OrgMember] {
            assert!(!identity(role, Some("org_1")).is_platform_admin());
        }
    }

    #[test]
    fn test_org_admin_flags() {
        assert!(identity(UserRole::OrgOwner, Some("org_1")).is_org_admin());
        assert!(identity(UserRole::OrgAdmin, Some("org_1")).is_org_admin());
        assert!(!identity(UserRole::OrgMember, Some("org_1")).is_org_admin());
        assert!(!identity(UserRole::SuperAdmin, None).is_org_admin());
    }
}
