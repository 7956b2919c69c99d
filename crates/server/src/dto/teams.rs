//! # Team Data Transfer Objects

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a new team
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTeamRequest {
    /// Team name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Team name must be between 1 and 255 characters"
    ))]
    pub name:        String,
    /// Team description
    #[validate(length(max = 2000, message = "Description must not exceed 2000 characters"))]
    pub description: Option<String>,
    /// Manager user ID; defaults to the caller
    pub manager_id:  Option<String>,
}

/// Request to update an existing team
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Team name must be between 1 and 255 characters"
    ))]
    pub name:        Option<String>,
    #[validate(length(max = 2000, message = "Description must not exceed 2000 characters"))]
    pub description: Option<String>,
    /// New manager user ID
    pub manager_id:  Option<String>,
}

/// Request to update the tri-state approvals on a team.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTeamApprovalRequest {
    /// Manager approval (pending, approved, rejected)
    pub manager_approved:  Option<String>,
    /// Director approval (pending, approved, rejected)
    pub director_approved: Option<String>,
}

/// Request to delete several teams at once.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkDeleteTeamsRequest {
    #[validate(length(min = 1, message = "At least one team id is required"))]
    pub team_ids: Vec<String>,
}

/// Request to add a member to a team
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddTeamMemberRequest {
    /// User ID to add
    #[validate(length(min = 1, message = "User ID is required"))]
    pub user_id: String,
    /// Role for the new member (lead, member, viewer)
    #[validate(length(min = 1, message = "Role is required"))]
    pub role:    String,
}

/// Response for a single team
#[derive(Debug, Clone, Serialize)]
pub struct TeamResponse {
    pub id:                String,
    pub organization_id:   String,
    pub name:              String,
    pub slug:              String,
    pub description:       Option<String>,
    pub manager_id:        String,
    pub manager_approved:  String,
    pub director_approved: String,
    pub member_count:      Option<u64>,
    pub created_at:        String,
    pub updated_at:        String,
}

impl TeamResponse {
    /// Convert a team entity into the response shape.
    pub fn from_model(team: &entity::teams::Model, member_count: Option<u64>) -> Self {
        Self {
            id:                team.id.clone(),
            organization_id:   team.organization_id.clone(),
            name:              team.name.clone(),
            slug:              team.slug.clone(),
            description:       team.description.clone(),
            manager_id:        team.manager_id.clone(),
            manager_approved:  team.manager_approved.to_string(),
            director_approved: team.director_approved.to_string(),
            member_count,
            created_at:        team.created_at.to_rfc3339(),
            updated_at:        team.updated_at.to_rfc3339(),
        }
    }
}

/// Response for a team member
#[derive(Debug, Clone, Serialize)]
pub struct TeamMemberResponse {
    pub id:           String,
    pub user_id:      String,
    pub email:        String,
    pub display_name: String,
    pub role:         String,
    pub joined_at:    String,
}

/// Result of a bulk team deletion.
#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteTeamsResponse {
    pub deleted: Vec<String>,
    pub skipped: Vec<String>,
}
