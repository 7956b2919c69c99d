//! Users Entity
//!
//! Represents platform and tenant users with authentication and role
//! information. Platform-level users (SuperAdmin, Admin) carry no
//! organization id; every other role belongs to exactly one organization.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id:                   String,
    pub email:                String,
    pub password_hash:        String,
    pub first_name:           Option<String>,
    pub last_name:            Option<String>,
    pub role:                 UserRole,
    pub organization_id:      Option<String>,
    pub is_active:            bool,
    pub must_change_password: bool,
    pub last_login_at:        Option<chrono::DateTime<chrono::Utc>>,
    pub created_at:           chrono::DateTime<chrono::Utc>,
    pub updated_at:           chrono::DateTime<chrono::Utc>,
    pub deleted_at:           Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Organization,
    #[sea_orm(has_many = "super::team_members::Entity")]
    TeamMembers,
    #[sea_orm(has_many = "super::team_managers::Entity")]
    TeamManagers,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef { Relation::Organization.def() }
}

impl Related<super::team_members::Entity> for Entity {
    fn to() -> RelationDef { Relation::TeamMembers.def() }
}

impl Related<super::team_managers::Entity> for Entity {
    fn to() -> RelationDef { Relation::TeamManagers.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Canonical user role enumeration.
///
/// The legacy member-plus-flags model maps onto this enum:
/// owner flag becomes `OrgOwner`, admin flag becomes `OrgAdmin`, neither
/// becomes `OrgMember`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Platform super administrator
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
    /// Platform administrator (platform-level only when no organization)
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Organization owner
    #[sea_orm(string_value = "org_owner")]
    OrgOwner,
    /// Organization administrator
    #[sea_orm(string_value = "org_admin")]
    OrgAdmin,
    /// Regular organization member
    #[sea_orm(string_value = "org_member")]
    OrgMember,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::SuperAdmin => write!(f, "super_admin"),
            UserRole::Admin => write!(f, "admin"),
            UserRole::OrgOwner => write!(f, "org_owner"),
            UserRole::OrgAdmin => write!(f, "org_admin"),
            UserRole::OrgMember => write!(f, "org_member"),
        }
    }
}

impl UserRole {
    /// Parse a role from its wire representation.
    #[must_use]
    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(UserRole::SuperAdmin),
            "admin" => Some(UserRole::Admin),
            "org_owner" => Some(UserRole::OrgOwner),
            "org_admin" => Some(UserRole::OrgAdmin),
            "org_member" => Some(UserRole::OrgMember),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            UserRole::SuperAdmin,
            UserRole::Admin,
            UserRole::OrgOwner,
            UserRole::OrgAdmin,
            UserRole::OrgMember,
        ] {
            assert_eq!(UserRole::from_string(&role.to_string()), Some(role));
        }
    }

    #[test]
    fn test_role_unknown_string() {
        assert_eq!(UserRole::from_string("member"), None);
        assert_eq!(UserRole::from_string(""), None);
    }
}
