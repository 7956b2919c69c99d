//! # Authorization Guards
//!
//! Pure Allow/Deny predicates over the request identity, composed per
//! endpoint as an ordered AND-chain. Each guard evaluates exactly one
//! authorization concern; the caller loads any resource snapshot up front
//! so the guards themselves stay free of I/O.

use std::collections::HashSet;

use crate::Identity;

/// Outcome of a single guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny(String),
}

impl GuardDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool { matches!(self, GuardDecision::Allow) }

    fn deny(reason: impl ToString) -> Self { GuardDecision::Deny(reason.to_string()) }
}

/// Snapshot of a team used by the team guards: one document lookup,
/// taken before the guard chain runs.
#[derive(Debug, Clone)]
pub struct TeamRef {
    pub id:              String,
    pub organization_id: String,
    pub manager_id:      String,
    pub member_ids:      HashSet<String>,
}

/// Allow iff the identity is a platform admin (SuperAdmin, or Admin with
/// no organization).
#[must_use]
pub fn platform_admin(identity: &Identity) -> GuardDecision {
    if identity.is_platform_admin() {
        GuardDecision::Allow
    }
    else {
        GuardDecision::deny("Platform administrator role is required")
    }
}

/// Allow iff the identity is an organization owner or admin.
#[must_use]
pub fn org_admin(identity: &Identity) -> GuardDecision {
    if identity.is_org_admin() {
        GuardDecision::Allow
    }
    else {
        GuardDecision::deny("Organization owner or admin role is required")
    }
}

/// Allow iff the identity may manage the team.
///
/// Precedence is fixed: platform admin, then org owner/admin, then the
/// cross-org check, then the manager and managed-set checks. The cross-org
/// denial fires before ownership is ever considered, so membership in a
/// foreign org's team never grants access.
#[must_use]
pub fn can_manage_team(identity: &Identity, team: &TeamRef) -> GuardDecision {
    if identity.is_platform_admin() {
        return GuardDecision::Allow;
    }

    if identity.organization_id.as_deref() != Some(team.organization_id.as_str()) {
        return GuardDecision::deny("cross-org: team belongs to a different organization");
    }

    if identity.is_org_admin() {
        return GuardDecision::Allow;
    }

    if team.manager_id == identity.id {
        return GuardDecision::Allow;
    }

    if identity.managed_team_ids.contains(&team.id) {
        return GuardDecision::Allow;
    }

    GuardDecision::deny("You do not have permission to manage this team")
}

/// Allow iff the identity may view the team.
///
/// Same precedence as [`can_manage_team`], plus any listed team member.
#[must_use]
pub fn can_view_team(identity: &Identity, team: &TeamRef) -> GuardDecision {
    if identity.is_platform_admin() {
        return GuardDecision::Allow;
    }

    if identity.organization_id.as_deref() != Some(team.organization_id.as_str()) {
        return GuardDecision::deny("cross-org: team belongs to a different organization");
    }

    if identity.is_org_admin() ||
        team.manager_id == identity.id ||
        identity.managed_team_ids.contains(&team.id) ||
        team.member_ids.contains(&identity.id)
    {
        return GuardDecision::Allow;
    }

    GuardDecision::deny("You do not have permission to view this team")
}

/// Allow iff the identity may invite members into its organization.
#[must_use]
pub fn can_invite_members(identity: &Identity) -> GuardDecision {
    if identity.is_platform_admin() || identity.is_org_admin() {
        GuardDecision::Allow
    }
    else {
        GuardDecision::deny("Only organization owners and admins can invite members")
    }
}

/// Allow iff the identity belongs to an organization; platform admins
/// are exempt.
#[must_use]
pub fn require_organization(identity: &Identity) -> GuardDecision {
    if identity.is_platform_admin() || identity.organization_id.is_some() {
        GuardDecision::Allow
    }
    else {
        GuardDecision::deny("User does not belong to an organization")
    }
}

/// Cross-tenant guard for explicit `:organization_id` route parameters.
///
/// The only guard that compares against a route parameter instead of a
/// loaded resource. It must run before any resource load so another
/// tenant's data is never fetched on a denied request.
#[must_use]
pub fn can_access_organization(identity: &Identity, target_organization_id: &str) -> GuardDecision {
    if identity.is_platform_admin() {
        return GuardDecision::Allow;
    }

    if identity.organization_id.as_deref() == Some(target_organization_id) {
        GuardDecision::Allow
    }
    else {
        GuardDecision::deny("cross-org: access to this organization is not permitted")
    }
}

/// Run guards in order, succeeding on the first Allow.
///
/// When every guard denies, the surfaced reason is the LAST denial
/// observed, so composed error messages stay deterministic.
#[must_use]
pub fn any_of(decisions: &[GuardDecision]) -> GuardDecision {
    let mut last_denial: Option<&GuardDecision> = None;
    for decision in decisions {
        match decision {
            GuardDecision::Allow => return GuardDecision::Allow,
            deny @ GuardDecision::Deny(_) => last_denial = Some(deny),
        }
    }

    last_denial
        .cloned()
        .unwrap_or_else(|| GuardDecision::deny("No guard allowed the request"))
}
