//! Organizations Entity
//!
//! The tenant root. Plan limits are never stored here; they are recomputed
//! from `plan` through the fixed lookup table on every check. The usage
//! counters are maintained with atomic conditional updates so plan quotas
//! cannot be overrun by concurrent creations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id:                      String,
    pub name:                    String,
    pub slug:                    String,
    pub plan:                    Plan,
    pub subscription_status:     SubscriptionStatus,
    pub trial_ends_at:           Option<chrono::DateTime<chrono::Utc>>,
    pub owner_id:                String,
    pub user_count:              i32,
    pub team_count:              i32,
    pub billing_customer_id:     Option<String>,
    pub billing_subscription_id: Option<String>,
    pub cancel_at_period_end:    bool,
    pub is_active:               bool,
    pub created_at:              chrono::DateTime<chrono::Utc>,
    pub updated_at:              chrono::DateTime<chrono::Utc>,
    pub deleted_at:              Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users::Entity")]
    Users,
    #[sea_orm(has_many = "super::teams::Entity")]
    Teams,
    #[sea_orm(has_many = "super::invitations::Entity")]
    Invitations,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef { Relation::Users.def() }
}

impl Related<super::teams::Entity> for Entity {
    fn to() -> RelationDef { Relation::Teams.def() }
}

impl Related<super::invitations::Entity> for Entity {
    fn to() -> RelationDef { Relation::Invitations.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Subscription plan enumeration
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[sea_orm(string_value = "free")]
    Free,
    #[sea_orm(string_value = "professional")]
    Professional,
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "enterprise")]
    Enterprise,
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Professional => write!(f, "professional"),
            Plan::Business => write!(f, "business"),
            Plan::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl Plan {
    #[must_use]
    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Plan::Free),
            "professional" => Some(Plan::Professional),
            "business" => Some(Plan::Business),
            "enterprise" => Some(Plan::Enterprise),
            _ => None,
        }
    }
}

/// Subscription status enumeration
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Trial period, feature access until the trial end date
    #[sea_orm(string_value = "trialing")]
    Trialing,
    /// Paid and current
    #[sea_orm(string_value = "active")]
    Active,
    /// Payment failed or trial expired
    #[sea_orm(string_value = "past_due")]
    PastDue,
    /// Subscription ended
    #[sea_orm(string_value = "canceled")]
    Canceled,
    /// Initial payment never completed
    #[sea_orm(string_value = "incomplete")]
    Incomplete,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Trialing => write!(f, "trialing"),
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::PastDue => write!(f, "past_due"),
            SubscriptionStatus::Canceled => write!(f, "canceled"),
            SubscriptionStatus::Incomplete => write!(f, "incomplete"),
        }
    }
}

impl SubscriptionStatus {
    /// Parse a provider status string, failing closed on unknown values.
    #[must_use]
    pub fn from_provider(s: &str) -> Self {
        match s {
            "trialing" => SubscriptionStatus::Trialing,
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::Incomplete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_round_trip() {
        for plan in [
            Plan::Free,
            Plan::Professional,
            Plan::Business,
            Plan::Enterprise,
        ] {
            assert_eq!(Plan::from_string(&plan.to_string()), Some(plan));
        }
    }

    #[test]
    fn test_subscription_status_from_provider_fails_closed() {
        assert_eq!(
            SubscriptionStatus::from_provider("active"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_provider("unpaid"),
            SubscriptionStatus::Incomplete
        );
        assert_eq!(
            SubscriptionStatus::from_provider(""),
            SubscriptionStatus::Incomplete
        );
    }
}
