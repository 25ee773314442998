//! Outcome Window Filter
//!
//! Keeps the events in `[assigned_at, assigned_at + window_days)`. Users whose
//! events all fall outside are not dropped here; the outcome aggregator still
//! emits a zero row for them.

use crate::model::{Assignment, EventRecord, UserId, WindowedEvent};
use chrono::{Days, NaiveDate};
use fxhash::FxHashMap;
use rayon::prelude::*;
use tracing::debug;

/// Exclusive end of a window starting at `assigned_at`
pub fn window_end(assigned_at: NaiveDate, window_days: u32) -> Option<NaiveDate> {
    assigned_at.checked_add_days(Days::new(u64::from(window_days)))
}

/// Restrict events to their user's outcome window.
///
/// Events of users without an assignment are discarded. Input order is kept.
pub fn filter_window(
    assignments: &[Assignment],
    events: &[EventRecord],
    window_days: u32,
) -> Vec<WindowedEvent> {
    let assigned_at: FxHashMap<UserId, NaiveDate> = assignments
        .iter()
        .map(|a| (a.user_id, a.assigned_at))
        .collect();

    let windowed: Vec<WindowedEvent> = events
        .par_iter()
        .filter_map(|event| {
            let start = *assigned_at.get(&event.user_id)?;
            let elapsed = (event.pseudo_event_date - start).num_days();
            if elapsed < 0 || elapsed >= i64::from(window_days) {
                return None;
            }
            Some(WindowedEvent {
                user_id: event.user_id,
                event_id: event.event_id,
                pseudo_event_date: event.pseudo_event_date,
                items: event.items,
                days_since_assignment: elapsed as u32,
            })
        })
        .collect();

    debug!(
        events = events.len(),
        windowed = windowed.len(),
        window_days,
        "filtered events to outcome window"
    );
    windowed
}
