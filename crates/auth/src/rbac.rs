//! # Role/Permission Table
//!
//! Static, process-wide mapping from role to permission set. The table is
//! built once at startup and has no runtime mutation path; a role without
//! an entry has the empty permission set, so lookups fail closed.
//!
//! Permissions follow a hierarchical naming convention:
//! - Format: `resource:action`
//! - Examples: `users:create`, `teams:read`, `invitations:revoke`

use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

use entity::users::UserRole;
use serde::{Deserialize, Serialize};

/// Represents a single permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// User-related permissions
    Users(UserAction),
    /// Team-related permissions
    Teams(TeamAction),
    /// Organization-related permissions
    Organizations(OrganizationAction),
    /// Invitation-related permissions
    Invitations(InvitationAction),
    /// Billing-related permissions
    Billing(BillingAction),
}

/// Actions available for user resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserAction {
    Create,
    Read,
    Update,
    Delete,
}

/// Actions available for team resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamAction {
    Create,
    Read,
    Update,
    Delete,
    MembersRead,
    MembersAdd,
    MembersRemove,
    Approve,
}

/// Actions available for organization resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrganizationAction {
    Create,
    Read,
    Update,
    Delete,
    List,
}

/// Actions available for invitations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvitationAction {
    Create,
    Read,
    Revoke,
}

/// Actions available for billing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingAction {
    Read,
    Manage,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Users(action) => write!(f, "users:{}", action),
            Permission::Teams(action) => write!(f, "teams:{}", action),
            Permission::Organizations(action) => write!(f, "organizations:{}", action),
            Permission::Invitations(action) => write!(f, "invitations:{}", action),
            Permission::Billing(action) => write!(f, "billing:{}", action),
        }
    }
}

impl std::fmt::Display for UserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserAction::Create => write!(f, "create"),
            UserAction::Read => write!(f, "read"),
            UserAction::Update => write!(f, "update"),
            UserAction::Delete => write!(f, "delete"),
        }
    }
}

impl std::fmt::Display for TeamAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamAction::Create => write!(f, "create"),
            TeamAction::Read => write!(f, "read"),
            TeamAction::Update => write!(f, "update"),
            TeamAction::Delete => write!(f, "delete"),
            TeamAction::MembersRead => write!(f, "members_read"),
            TeamAction::MembersAdd => write!(f, "members_add"),
            TeamAction::MembersRemove => write!(f, "members_remove"),
            TeamAction::Approve => write!(f, "approve"),
        }
    }
}

impl std::fmt::Display for OrganizationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrganizationAction::Create => write!(f, "create"),
            OrganizationAction::Read => write!(f, "read"),
            OrganizationAction::Update => write!(f, "update"),
            OrganizationAction::Delete => write!(f, "delete"),
            OrganizationAction::List => write!(f, "list"),
        }
    }
}

impl std::fmt::Display for InvitationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationAction::Create => write!(f, "create"),
            InvitationAction::Read => write!(f, "read"),
            InvitationAction::Revoke => write!(f, "revoke"),
        }
    }
}

impl std::fmt::Display for BillingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingAction::Read => write!(f, "read"),
            BillingAction::Manage => write!(f, "manage"),
        }
    }
}

/// Every permission the platform knows about.
fn all_permissions() -> HashSet<Permission> {
    let mut set = HashSet::new();
    for action in [
        UserAction::Create,
        UserAction::Read,
        UserAction::Update,
        UserAction::Delete,
    ] {
        set.insert(Permission::Users(action));
    }
    for action in [
        TeamAction::Create,
        TeamAction::Read,
        TeamAction::Update,
        TeamAction::Delete,
        TeamAction::MembersRead,
        TeamAction::MembersAdd,
        TeamAction::MembersRemove,
        TeamAction::Approve,
    ] {
        set.insert(Permission::Teams(action));
    }
    for action in [
        OrganizationAction::Create,
        OrganizationAction::Read,
        OrganizationAction::Update,
        OrganizationAction::Delete,
        OrganizationAction::List,
    ] {
        set.insert(Permission::Organizations(action));
    }
    for action in [
        InvitationAction::Create,
        InvitationAction::Read,
        InvitationAction::Revoke,
    ] {
        set.insert(Permission::Invitations(action));
    }
    for action in [BillingAction::Read, BillingAction::Manage] {
        set.insert(Permission::Billing(action));
    }
    set
}

/// The static role→permission table, built once per process.
static ROLE_PERMISSIONS: LazyLock<HashMap<UserRole, HashSet<Permission>>> = LazyLock::new(|| {
    let mut table = HashMap::new();

    // Platform roles hold every permission; tenant scoping is the guards'
    // concern, not the table's.
    table.insert(UserRole::SuperAdmin, all_permissions());
    table.insert(UserRole::Admin, all_permissions());

    let owner: HashSet<Permission> = all_permissions()
        .into_iter()
        .filter(|p| {
            !matches!(
                p,
                Permission::Organizations(OrganizationAction::List) |
                    Permission::Organizations(OrganizationAction::Create)
            )
        })
        .collect();
    table.insert(UserRole::OrgOwner, owner);

    let admin: HashSet<Permission> = all_permissions()
        .into_iter()
        .filter(|p| {
            !matches!(
                p,
                Permission::Organizations(OrganizationAction::List) |
                    Permission::Organizations(OrganizationAction::Create) |
                    Permission::Organizations(OrganizationAction::Delete) |
                    Permission::Billing(BillingAction::Manage)
            )
        })
        .collect();
    table.insert(UserRole::OrgAdmin, admin);

    table.insert(
        UserRole::OrgMember,
        HashSet::from([
            Permission::Users(UserAction::Read),
            Permission::Teams(TeamAction::Read),
            Permission::Teams(TeamAction::MembersRead),
            Permission::Organizations(OrganizationAction::Read),
        ]),
    );

    table
});

/// Check if a role grants a specific permission.
#[must_use]
pub fn has_permission(role: UserRole, permission: Permission) -> bool {
    ROLE_PERMISSIONS
        .get(&role)
        .is_some_and(|set| set.contains(&permission))
}

/// Check if a role grants at least one of the permissions (OR semantics).
#[must_use]
pub fn has_any_permission(role: UserRole, permissions: &[Permission]) -> bool {
    permissions.iter().any(|p| has_permission(role, *p))
}

/// Check if a role grants all of the permissions (AND semantics).
#[must_use]
pub fn has_all_permissions(role: UserRole, permissions: &[Permission]) -> bool {
    permissions.iter().all(|p| has_permission(role, *p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_admin_has_everything() {
        for permission in all_permissions() {
            assert!(
                has_permission(UserRole::SuperAdmin, permission),
                "super_admin missing {}",
                permission
            );
        }
    }

    #[test]
    fn test_org_member_cannot_create_teams() {
        assert!(!has_permission(
            UserRole::OrgMember,
            Permission::Teams(TeamAction::Create)
        ));
        assert!(has_permission(
            UserRole::OrgMember,
            Permission::Teams(TeamAction::Read)
        ));
    }

    #[test]
    fn test_org_admin_cannot_delete_org_or_manage_billing() {
        assert!(!has_permission(
            UserRole::OrgAdmin,
            Permission::Organizations(OrganizationAction::Delete)
        ));
        assert!(!has_permission(
            UserRole::OrgAdmin,
            Permission::Billing(BillingAction::Manage)
        ));
        assert!(has_permission(
            UserRole::OrgAdmin,
            Permission::Users(UserAction::Create)
        ));
    }

    #[test]
    fn test_org_owner_manages_billing_but_not_platform_listing() {
        assert!(has_permission(
            UserRole::OrgOwner,
            Permission::Billing(BillingAction::Manage)
        ));
        assert!(!has_permission(
            UserRole::OrgOwner,
            Permission::Organizations(OrganizationAction::List)
        ));
        assert!(!has_permission(
            UserRole::OrgOwner,
            Permission::Organizations(OrganizationAction::Create)
        ));
    }

    #[test]
    fn test_has_any_permission_or_semantics() {
        let perms = [
            Permission::Teams(TeamAction::Create),
            Permission::Teams(TeamAction::Read),
        ];
        assert!(has_any_permission(UserRole::OrgMember, &perms));
        assert!(!has_any_permission(
            UserRole::OrgMember,
            &[
                Permission::Teams(TeamAction::Create),
                Permission::Teams(TeamAction::Delete),
            ]
        ));
    }

    #[test]
    fn test_has_all_permissions_and_semantics() {
        assert!(has_all_permissions(
            UserRole::OrgAdmin,
            &[
                Permission::Teams(TeamAction::Create),
                Permission::Invitations(InvitationAction::Create),
            ]
        ));
        assert!(!has_all_permissions(
            UserRole::OrgMember,
            &[
                Permission::Teams(TeamAction::Read),
                Permission::Teams(TeamAction::Create),
            ]
        ));
    }

    #[test]
    fn test_empty_permission_list_edge_cases() {
        // any-of over nothing is false, all-of over nothing is vacuously true
        assert!(!has_any_permission(UserRole::SuperAdmin, &[]));
        assert!(has_all_permissions(UserRole::OrgMember, &[]));
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(
            Permission::Teams(TeamAction::MembersAdd).to_string(),
            "teams:members_add"
        );
        assert_eq!(
            Permission::Billing(BillingAction::Manage).to_string(),
            "billing:manage"
        );
        assert_eq!(
            Permission::Invitations(InvitationAction::Revoke).to_string(),
            "invitations:revoke"
        );
    }
}
