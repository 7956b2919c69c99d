//! Invitations Entity
//!
//! Token-bound offers to join an organization (and optionally a team).
//! `expires_at` is the authority for expiry: the stored status is advisory
//! and is compared against the clock at read time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::users::UserRole;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "invitations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id:              String,
    pub organization_id: String,
    pub team_id:         Option<String>,
    pub email:           String,
    pub role:            UserRole,
    pub token:           String,
    pub status:          InvitationStatus,
    pub invited_by:      String,
    pub expires_at:      chrono::DateTime<chrono::Utc>,
    pub created_at:      chrono::DateTime<chrono::Utc>,
    pub updated_at:      chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Organization,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef { Relation::Organization.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Invitation lifecycle status
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "revoked")]
    Revoked,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationStatus::Pending => write!(f, "pending"),
            InvitationStatus::Accepted => write!(f, "accepted"),
            InvitationStatus::Revoked => write!(f, "revoked"),
            InvitationStatus::Expired => write!(f, "expired"),
        }
    }
}

impl Model {
    /// Whether the invitation can still be consumed at `now`.
    ///
    /// Pending status alone is not enough: an invitation whose `expires_at`
    /// has passed is invalid even when the stored status was never updated.
    #[must_use]
    pub fn is_consumable(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.status == InvitationStatus::Pending && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn invitation(status: InvitationStatus, expires_in: Duration) -> Model {
        let now = Utc::now();
        Model {
            id:              "inv_test".to_string(),
            organization_id: "org_test".to_string(),
            team_id:         None,
            email:           "new@example.com".to_string(),
            role:            UserRole::OrgMember,
            token:           "token".to_string(),
            status,
            invited_by:      "usr_admin".to_string(),
            expires_at:      now + expires_in,
            created_at:      now,
            updated_at:      now,
        }
    }

    #[test]
    fn test_pending_unexpired_is_consumable() {
        let inv = invitation(InvitationStatus::Pending, Duration::days(7));
        assert!(inv.is_consumable(Utc::now()));
    }

    #[test]
    fn test_pending_but_expired_is_not_consumable() {
        let inv = invitation(InvitationStatus::Pending, Duration::seconds(-1));
        assert!(!inv.is_consumable(Utc::now()));
    }

    #[test]
    fn test_non_pending_is_never_consumable() {
        for status in [
            InvitationStatus::Accepted,
            InvitationStatus::Revoked,
            InvitationStatus::Expired,
        ] {
            let inv = invitation(status, Duration::days(7));
            assert!(!inv.is_consumable(Utc::now()));
        }
    }
}
