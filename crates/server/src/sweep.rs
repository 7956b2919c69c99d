//! # Trial Expiry Sweep
//!
//! Daily job over all trialing organizations. Expired trials transition to
//! past-due exactly once (the UPDATE is conditioned on the status still
//! being `trialing`); organizations at the 7/3/1-day marks get a warning
//! notification. Warnings are keyed by the day count alone, so a sweep
//! that runs twice on the same calendar day resends them — a known
//! weakness of this notification scheme, not of the status transition.
//!
//! Per-organization failures are caught and logged so one bad record never
//! aborts the sweep for the rest. The sweep must not run concurrently with
//! itself; multi-replica deployments should invoke `meridian sweep` from a
//! single job runner instead of enabling the in-process scheduler.

use billing::access::trial_days_left;
use chrono::{Duration, Timelike, Utc};
use entity::{
    organizations::{self, SubscriptionStatus},
    users,
};
use error::Result;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{error, info, warn};

use crate::{
    cache::{organization_key, Cache},
    AppState,
};

/// Trial-day marks that trigger a warning notification.
const WARNING_DAYS: [i64; 3] = [7, 3, 1];

/// Outcome counters for one sweep run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    /// Trialing organizations examined
    pub checked:      u64,
    /// Organizations transitioned to past-due
    pub transitioned: u64,
    /// Warning notifications sent
    pub warnings:     u64,
    /// Organizations that failed to process
    pub errors:       u64,
}

/// Run one sweep over every trialing organization.
pub async fn run_trial_sweep(state: &AppState) -> Result<SweepStats> {
    let trialing = organizations::Entity::find()
        .filter(organizations::Column::SubscriptionStatus.eq(SubscriptionStatus::Trialing))
        .filter(organizations::Column::DeletedAt.is_null())
        .all(&state.db)
        .await?;

    let mut stats = SweepStats::default();

    for org in trialing {
        stats.checked += 1;
        let org_id = org.id.clone();
        match process_organization(state, org).await {
            Ok(Outcome::Transitioned) => stats.transitioned += 1,
            Ok(Outcome::Warned) => stats.warnings += 1,
            Ok(Outcome::Untouched) => {},
            Err(e) => {
                stats.errors += 1;
                error!(organization_id = %org_id, error = %e, "Trial sweep failed for organization");
            },
        }
    }

    info!(
        checked = stats.checked,
        transitioned = stats.transitioned,
        warnings = stats.warnings,
        errors = stats.errors,
        "Trial sweep finished"
    );

    Ok(stats)
}

enum Outcome {
    Transitioned,
    Warned,
    Untouched,
}

async fn process_organization(state: &AppState, org: organizations::Model) -> Result<Outcome> {
    let Some(trial_ends_at) = org.trial_ends_at else {
        warn!(organization_id = %org.id, "Trialing organization has no trial end date, skipping");
        return Ok(Outcome::Untouched);
    };

    let days_left = trial_days_left(trial_ends_at, Utc::now());

    if days_left <= 0 {
        // Exactly-once: only a still-trialing row transitions. A second
        // sweep on the same day no-ops here but still sends the notice,
        // because the notification is keyed by the day count alone.
        let update = organizations::Entity::update_many()
            .set(organizations::ActiveModel {
                subscription_status: Set(SubscriptionStatus::PastDue),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(organizations::Column::Id.eq(&org.id))
            .filter(
                organizations::Column::SubscriptionStatus.eq(SubscriptionStatus::Trialing),
            )
            .exec(&state.db)
            .await?;

        let transitioned = update.rows_affected > 0;
        if transitioned {
            Cache::new(state.redis.clone())
                .delete(&organization_key(&org.id))
                .await;
            info!(organization_id = %org.id, "Trial expired, organization moved to past-due");
        }

        if let Some(owner_email) = owner_email(state, &org).await? {
            state.mailer.send_trial_expired(&owner_email, &org.name);
        }

        return Ok(if transitioned {
            Outcome::Transitioned
        }
        else {
            Outcome::Untouched
        });
    }

    if WARNING_DAYS.contains(&days_left) {
        if let Some(owner_email) = owner_email(state, &org).await? {
            state
                .mailer
                .send_trial_warning(&owner_email, &org.name, days_left);
        }
        info!(organization_id = %org.id, days_left, "Trial warning sent");
        return Ok(Outcome::Warned);
    }

    Ok(Outcome::Untouched)
}

async fn owner_email(state: &AppState, org: &organizations::Model) -> Result<Option<String>> {
    let owner = users::Entity::find_by_id(&org.owner_id)
        .one(&state.db)
        .await?;

    if owner.is_none() {
        warn!(organization_id = %org.id, owner_id = %org.owner_id, "Organization owner not found, skipping notification");
    }

    Ok(owner.map(|user| user.email))
}

/// Run the sweep once a day at the given UTC hour.
///
/// Single in-process scheduler with no distributed lock: enable on exactly
/// one instance.
pub fn spawn_daily_sweep(state: AppState, hour_utc: u32) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = duration_until_hour(hour_utc);
            info!(
                next_run_in_seconds = wait.num_seconds(),
                hour_utc, "Trial sweep scheduled"
            );
            tokio::time::sleep(
                wait.to_std()
                    .unwrap_or_else(|_| std::time::Duration::from_secs(60)),
            )
            .await;

            if let Err(e) = run_trial_sweep(&state).await {
                error!(error = %e, "Trial sweep run failed");
            }
        }
    })
}

/// Time until the next occurrence of `hour_utc:00:00`.
fn duration_until_hour(hour_utc: u32) -> Duration {
    let now = Utc::now();
    let today_run = now
        .with_hour(hour_utc.min(23))
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);

    if today_run > now {
        today_run - now
    }
    else {
        today_run + Duration::days(1) - now
    }
}
