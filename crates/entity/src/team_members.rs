//! Team Members Entity
//!
//! Join table between teams and users with a per-team role.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "team_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id:         String,
    pub team_id:    String,
    pub user_id:    String,
    pub role:       TeamMemberRole,
    pub joined_at:  chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::teams::Entity",
        from = "Column::TeamId",
        to = "super::teams::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Team,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::teams::Entity> for Entity {
    fn to() -> RelationDef { Relation::Team.def() }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Role of a user within a team
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum TeamMemberRole {
    /// Team lead, can act for the manager inside the team
    #[sea_orm(string_value = "lead")]
    Lead,
    /// Regular member
    #[sea_orm(string_value = "member")]
    Member,
    /// Read-only member
    #[sea_orm(string_value = "viewer")]
    Viewer,
}

impl std::fmt::Display for TeamMemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamMemberRole::Lead => write!(f, "lead"),
            TeamMemberRole::Member => write!(f, "member"),
            TeamMemberRole::Viewer => write!(f, "viewer"),
        }
    }
}

impl TeamMemberRole {
    #[must_use]
    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "lead" => Some(TeamMemberRole::Lead),
            "member" => Some(TeamMemberRole::Member),
            "viewer" => Some(TeamMemberRole::Viewer),
            _ => None,
        }
    }
}
