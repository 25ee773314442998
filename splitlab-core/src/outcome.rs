//! Outcome Aggregation
//!
//! A total function over the assignment table: every assigned user gets
//! exactly one [`UserOutcome`], whether or not they have windowed events
//! (a left-outer aggregation over assignments).

use crate::config::OutcomeConfig;
use crate::error::DataIntegrityError;
use crate::model::{Assignment, EventRecord, UserId, UserOutcome, Variant, WindowedEvent};
use chrono::{Days, NaiveDate};
use fxhash::{FxHashMap, FxHashSet};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
struct Activity {
    events: u64,
    volume: u64,
}

/// Reduce windowed events to one outcome per assignment row.
///
/// `events` is the full (unwindowed) timeline, used only for the
/// pre-assignment covariate over `[assigned_at - pre_period_days, assigned_at)`.
///
/// Fails if a user has more than one assignment row, or if a windowed event
/// belongs to a user that was never assigned.
pub fn aggregate_outcomes(
    assignments: &[Assignment],
    windowed: &[WindowedEvent],
    events: &[EventRecord],
    config: &OutcomeConfig,
) -> Result<Vec<UserOutcome>, DataIntegrityError> {
    let assigned = index_assignments(assignments)?;

    let mut in_window: FxHashMap<UserId, Vec<&WindowedEvent>> = FxHashMap::default();
    for event in windowed {
        if !assigned.contains_key(&event.user_id) {
            return Err(DataIntegrityError::UnassignedUser {
                user_id: event.user_id,
            });
        }
        in_window.entry(event.user_id).or_default().push(event);
    }

    let mut pre_period: FxHashMap<UserId, Activity> = FxHashMap::default();
    for event in events {
        let Some(assignment) = assigned.get(&event.user_id) else {
            continue;
        };
        if in_pre_period(event.pseudo_event_date, assignment.assigned_at, config.pre_period_days) {
            let activity = pre_period.entry(event.user_id).or_default();
            activity.events += 1;
            activity.volume += event.items;
        }
    }

    let outcomes: Vec<UserOutcome> = assignments
        .par_iter()
        .map(|assignment| {
            let user_events = in_window
                .get(&assignment.user_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let pre = pre_period
                .get(&assignment.user_id)
                .copied()
                .unwrap_or_default();
            user_outcome(assignment, user_events, pre, config)
        })
        .collect();

    debug!(
        users = outcomes.len(),
        active = in_window.len(),
        "aggregated user outcomes"
    );
    Ok(outcomes)
}

fn index_assignments(
    assignments: &[Assignment],
) -> Result<FxHashMap<UserId, &Assignment>, DataIntegrityError> {
    let mut index: FxHashMap<UserId, &Assignment> = FxHashMap::default();
    for assignment in assignments {
        if let Some(existing) = index.insert(assignment.user_id, assignment) {
            return Err(if existing.variant == assignment.variant {
                DataIntegrityError::DuplicateAssignment {
                    user_id: assignment.user_id,
                }
            } else {
                DataIntegrityError::Contamination {
                    user_id: assignment.user_id,
                    first: existing.variant,
                    second: assignment.variant,
                }
            });
        }
    }
    Ok(index)
}

fn in_pre_period(date: NaiveDate, assigned_at: NaiveDate, pre_period_days: u32) -> bool {
    if date >= assigned_at {
        return false;
    }
    match assigned_at.checked_sub_days(Days::new(u64::from(pre_period_days))) {
        Some(start) => date >= start,
        None => true,
    }
}

fn user_outcome(
    assignment: &Assignment,
    events: &[&WindowedEvent],
    pre: Activity,
    config: &OutcomeConfig,
) -> UserOutcome {
    let events_in_window = events.len() as u64;
    let volume_in_window: u64 = events.iter().map(|e| e.items).sum();

    let retained: BTreeMap<u32, bool> = config
        .retention_checkpoints
        .iter()
        .map(|&day| {
            let active = events.iter().any(|e| e.days_since_assignment < day);
            (day, active)
        })
        .collect();

    UserOutcome {
        user_id: assignment.user_id,
        variant: assignment.variant,
        assigned_at: assignment.assigned_at,
        window_days: config.window_days,
        events_in_window,
        volume_in_window,
        converted: events_in_window >= 1,
        retained,
        pre_events: pre.events,
        pre_volume: pre.volume,
    }
}

/// Check that outcomes cover the assignment table exactly once per user
pub fn verify_outcomes(
    assignments: &[Assignment],
    outcomes: &[UserOutcome],
) -> Result<(), DataIntegrityError> {
    let expected: FxHashMap<UserId, Variant> = assignments
        .iter()
        .map(|a| (a.user_id, a.variant))
        .collect();

    let mut seen: FxHashSet<UserId> = FxHashSet::default();
    for outcome in outcomes {
        if !expected.contains_key(&outcome.user_id) {
            return Err(DataIntegrityError::UnassignedUser {
                user_id: outcome.user_id,
            });
        }
        if !seen.insert(outcome.user_id) {
            return Err(DataIntegrityError::DuplicateOutcome {
                user_id: outcome.user_id,
            });
        }
    }

    match assignments.iter().find(|a| !seen.contains(&a.user_id)) {
        Some(missing) => Err(DataIntegrityError::MissingOutcome {
            user_id: missing.user_id,
        }),
        None => Ok(()),
    }
}
