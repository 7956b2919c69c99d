//! Prefixed entity identifiers.
//!
//! CUID2 ids with a short type prefix, generated in application code so
//! every store backend gets the same id shape.

/// Generate a user id (`usr_...`).
#[must_use]
pub fn user_id() -> String { format!("usr_{}", cuid2::create_id()) }

/// Generate an organization id (`org_...`).
#[must_use]
pub fn organization_id() -> String { format!("org_{}", cuid2::create_id()) }

/// Generate a team id (`team_...`).
#[must_use]
pub fn team_id() -> String { format!("team_{}", cuid2::create_id()) }

/// Generate a team member id (`tm_...`).
#[must_use]
pub fn team_member_id() -> String { format!("tm_{}", cuid2::create_id()) }

/// Generate a team manager assignment id (`tmgr_...`).
#[must_use]
pub fn team_manager_id() -> String { format!("tmgr_{}", cuid2::create_id()) }

/// Generate an invitation id (`inv_...`).
#[must_use]
pub fn invitation_id() -> String { format!("inv_{}", cuid2::create_id()) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_prefixed() {
        assert!(user_id().starts_with("usr_"));
        assert!(organization_id().starts_with("org_"));
        assert!(team_id().starts_with("team_"));
        assert!(invitation_id().starts_with("inv_"));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(user_id(), user_id());
        assert_ne!(team_id(), team_id());
    }
}
