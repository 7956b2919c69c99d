//! # Subscription Access Gate
//!
//! Pure predicates over organization subscription state. The gate decides
//! feature access; the quota predicates decide whether countable resources
//! may still be created. Platform-admin identities never reach the gate —
//! that bypass is a role check performed upstream.

use chrono::{DateTime, Utc};
use entity::organizations::{Model as Organization, SubscriptionStatus};

use crate::plan::PlanLimits;

/// Whether the organization currently has feature access.
///
/// True iff the subscription is active, or trialing with time left on the
/// trial. Every other status denies.
#[must_use]
pub fn can_access_features(org: &Organization, now: DateTime<Utc>) -> bool {
    match org.subscription_status {
        SubscriptionStatus::Active => true,
        SubscriptionStatus::Trialing => org.trial_ends_at.is_some_and(|ends| ends > now),
        SubscriptionStatus::PastDue |
        SubscriptionStatus::Canceled |
        SubscriptionStatus::Incomplete => false,
    }
}

/// Days left on the trial, rounded up.
///
/// `trial_ends_at` exactly `now` or in the past yields zero or a negative
/// count; a fraction of a day remaining counts as a full day.
#[must_use]
pub fn trial_days_left(trial_ends_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = trial_ends_at - now;
    let seconds = remaining.num_seconds();
    seconds.div_euclid(86_400) + i64::from(seconds.rem_euclid(86_400) > 0)
}

/// Whether another user may be created under the organization's plan.
#[must_use]
pub fn can_add_user(org: &Organization) -> bool {
    org.user_count < PlanLimits::for_plan(org.plan).max_users
}

/// Whether another team may be created under the organization's plan.
#[must_use]
pub fn can_add_team(org: &Organization) -> bool {
    org.team_count < PlanLimits::for_plan(org.plan).max_teams
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use entity::organizations::Plan;

    use super::*;

    fn org(status: SubscriptionStatus, trial_ends_at: Option<DateTime<Utc>>) -> Organization {
        let now = Utc::now();
        Organization {
            id:                      "org_test".to_string(),
            name:                    "Test Org".to_string(),
            slug:                    "test-org".to_string(),
            plan:                    Plan::Free,
            subscription_status:     status,
            trial_ends_at,
            owner_id:                "usr_owner".to_string(),
            user_count:              1,
            team_count:              0,
            billing_customer_id:     None,
            billing_subscription_id: None,
            cancel_at_period_end:    false,
            is_active:               true,
            created_at:              now,
            updated_at:              now,
            deleted_at:              None,
        }
    }

    #[test]
    fn test_active_always_allows() {
        let o = org(SubscriptionStatus::Active, None);
        assert!(can_access_features(&o, Utc::now()));
    }

    #[test]
    fn test_trialing_allows_until_trial_end() {
        let now = Utc::now();
        let o = org(SubscriptionStatus::Trialing, Some(now + Duration::days(2)));
        assert!(can_access_features(&o, now));

        let expired = org(SubscriptionStatus::Trialing, Some(now - Duration::seconds(1)));
        assert!(!can_access_features(&expired, now));
    }

    #[test]
    fn test_trialing_without_end_date_denies() {
        let o = org(SubscriptionStatus::Trialing, None);
        assert!(!can_access_features(&o, Utc::now()));
    }

    #[test]
    fn test_all_other_statuses_deny() {
        let now = Utc::now();
        for status in [
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
        ] {
            let o = org(status, Some(now + Duration::days(30)));
            assert!(!can_access_features(&o, now), "{} must deny", status);
        }
    }

    #[test]
    fn test_trial_days_left_ceiling() {
        let now = Utc::now();
        assert_eq!(trial_days_left(now + Duration::days(7), now), 7);
        assert_eq!(trial_days_left(now + Duration::hours(1), now), 1);
        assert_eq!(
            trial_days_left(now + Duration::days(2) + Duration::hours(1), now),
            3
        );
        assert_eq!(trial_days_left(now, now), 0);
        assert_eq!(trial_days_left(now - Duration::hours(5), now), 0);
        assert_eq!(trial_days_left(now - Duration::days(3), now), -3);
    }

    #[test]
    fn test_can_add_user_flips_exactly_at_limit() {
        let mut o = org(SubscriptionStatus::Active, None);
        o.plan = Plan::Free;

        o.user_count = 4;
        assert!(can_add_user(&o));

        o.user_count = 5;
        assert!(!can_add_user(&o));
    }

    #[test]
    fn test_can_add_team_at_free_limit() {
        let mut o = org(SubscriptionStatus::Active, None);
        o.plan = Plan::Free;
        o.team_count = 3;
        assert!(!can_add_team(&o));

        o.team_count = 2;
        assert!(can_add_team(&o));
    }

    #[test]
    fn test_enterprise_never_hits_quota() {
        let mut o = org(SubscriptionStatus::Active, None);
        o.plan = Plan::Enterprise;
        o.user_count = 1_000_000;
        o.team_count = 1_000_000;
        assert!(can_add_user(&o));
        assert!(can_add_team(&o));
    }
}
