//! # Plan Limits
//!
//! The fixed plan→limits lookup table. Limits are derived from the plan on
//! every check and are never stored, so a plan change takes effect
//! immediately and limits cannot drift from the plan.

use entity::organizations::Plan;
use serde::Serialize;

/// Quota ceilings and feature set for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    /// Maximum number of users in the organization
    pub max_users: i32,
    /// Maximum number of teams in the organization
    pub max_teams: i32,
    /// Features included in the plan
    pub features:  &'static [&'static str],
}

impl PlanLimits {
    /// Effectively unbounded ceiling for the enterprise plan.
    pub const UNBOUNDED: i32 = i32::MAX;

    /// Look up the limits for a plan.
    #[must_use]
    pub fn for_plan(plan: Plan) -> Self {
        match plan {
            Plan::Free => {
                Self {
                    max_users: 5,
                    max_teams: 3,
                    features:  &["teams", "invitations"],
                }
            },
            Plan::Professional => {
                Self {
                    max_users: 50,
                    max_teams: 20,
                    features:  &["teams", "invitations", "analytics"],
                }
            },
            Plan::Business => {
                Self {
                    max_users: 200,
                    max_teams: 100,
                    features:  &["teams", "invitations", "analytics", "audit-log"],
                }
            },
            Plan::Enterprise => {
                Self {
                    max_users: Self::UNBOUNDED,
                    max_teams: Self::UNBOUNDED,
                    features:  &["teams", "invitations", "analytics", "audit-log", "sso"],
                }
            },
        }
    }

    /// Whether the plan includes a named feature.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool { self.features.contains(&feature) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_plan_limits() {
        let limits = PlanLimits::for_plan(Plan::Free);
        assert_eq!(limits.max_users, 5);
        assert_eq!(limits.max_teams, 3);
    }

    #[test]
    fn test_professional_plan_limits() {
        let limits = PlanLimits::for_plan(Plan::Professional);
        assert_eq!(limits.max_users, 50);
        assert_eq!(limits.max_teams, 20);
    }

    #[test]
    fn test_business_plan_limits() {
        let limits = PlanLimits::for_plan(Plan::Business);
        assert_eq!(limits.max_users, 200);
        assert_eq!(limits.max_teams, 100);
    }

    #[test]
    fn test_enterprise_plan_is_unbounded() {
        let limits = PlanLimits::for_plan(Plan::Enterprise);
        assert_eq!(limits.max_users, PlanLimits::UNBOUNDED);
        assert_eq!(limits.max_teams, PlanLimits::UNBOUNDED);
    }

    #[test]
    fn test_feature_lookup() {
        assert!(PlanLimits::for_plan(Plan::Free).has_feature("teams"));
        assert!(!PlanLimits::for_plan(Plan::Free).has_feature("sso"));
        assert!(PlanLimits::for_plan(Plan::Enterprise).has_feature("sso"));
    }

    #[test]
    fn test_limits_grow_with_plan_tier() {
        let tiers = [Plan::Free, Plan::Professional, Plan::Business, Plan::Enterprise];
        for pair in tiers.windows(2) {
            let lower = PlanLimits::for_plan(pair[0]);
            let upper = PlanLimits::for_plan(pair[1]);
            assert!(upper.max_users > lower.max_users);
            assert!(upper.max_teams > lower.max_teams);
        }
    }
}
