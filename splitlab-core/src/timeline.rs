//! Pseudo-Timeline Construction
//!
//! The order log only carries "days since prior order". Each user's orders
//! are sorted by order number and placed on a calendar by a running prefix sum
//! of those deltas, starting at a base date shared by all users.
//!
//! ```text
//! order_number      1     2     3     4
//! delta (days)      -     7     0    12
//! cumulative        0     7     7    19
//! pseudo date      d0  d0+7  d0+7  d0+19
//! ```

use crate::error::DataIntegrityError;
use crate::model::{EventRecord, LineItem, OrderId, OrderRecord, UserId};
use chrono::{Days, NaiveDate};
use fxhash::FxHashMap;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Build the pseudo-timeline of every user in the orders table.
///
/// Missing (or NaN) deltas count as 0 and the first order's delta is always
/// ignored. Negative deltas are rejected. Event volume is the sum of
/// `item_count` over the order's line items, 0 when there are none.
///
/// Users come out in ascending id order, each user's events in sequence order.
pub fn build_timeline(
    orders: &[OrderRecord],
    line_items: &[LineItem],
    base_date: NaiveDate,
) -> Result<Vec<EventRecord>, DataIntegrityError> {
    let mut items_per_order: FxHashMap<OrderId, u64> = FxHashMap::default();
    for item in line_items {
        *items_per_order.entry(item.order_id).or_default() += item.item_count;
    }

    let mut per_user: BTreeMap<UserId, Vec<&OrderRecord>> = BTreeMap::new();
    for order in orders {
        per_user.entry(order.user_id).or_default().push(order);
    }

    let timelines: Vec<Vec<EventRecord>> = per_user
        .into_par_iter()
        .map(|(user_id, user_orders)| {
            build_user_timeline(user_id, user_orders, &items_per_order, base_date)
        })
        .collect::<Result<_, _>>()?;

    let events: Vec<EventRecord> = timelines.into_iter().flatten().collect();
    debug!(events = events.len(), "built pseudo-timeline");
    Ok(events)
}

fn build_user_timeline(
    user_id: UserId,
    mut orders: Vec<&OrderRecord>,
    items_per_order: &FxHashMap<OrderId, u64>,
    base_date: NaiveDate,
) -> Result<Vec<EventRecord>, DataIntegrityError> {
    // Stable: orders sharing a sequence number keep their input order
    orders.sort_by_key(|order| order.order_number);

    let mut cumulative = 0.0_f64;
    let mut events = Vec::with_capacity(orders.len());

    for (position, order) in orders.into_iter().enumerate() {
        let delta = if position == 0 {
            0.0
        } else {
            order
                .days_since_prior_order
                .filter(|d| !d.is_nan())
                .unwrap_or(0.0)
        };
        if delta < 0.0 {
            return Err(DataIntegrityError::NegativeDelta {
                user_id,
                order_id: order.order_id,
                delta,
            });
        }
        cumulative += delta;

        let day_offset = cumulative.floor();
        if day_offset > f64::from(u32::MAX) {
            return Err(DataIntegrityError::TimelineOverflow { user_id });
        }
        let day_offset = day_offset as u32;
        let pseudo_event_date = base_date
            .checked_add_days(Days::new(u64::from(day_offset)))
            .ok_or(DataIntegrityError::TimelineOverflow { user_id })?;

        events.push(EventRecord {
            user_id,
            event_id: order.order_id,
            sequence: order.order_number,
            day_offset,
            pseudo_event_date,
            items: items_per_order.get(&order.order_id).copied().unwrap_or(0),
        });
    }

    Ok(events)
}
