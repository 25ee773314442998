//! Record types flowing through the outcome pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// User identifier as found in the orders table
pub type UserId = u64;

/// Order identifier as found in the orders and line-item tables
pub type OrderId = u64;

/// Experiment arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// Control
    A,
    /// Treatment
    B,
}

impl Variant {
    /// Both arms, control first
    pub const ALL: [Variant; 2] = [Variant::A, Variant::B];

    /// Single-letter label
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::A => "A",
            Variant::B => "B",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" | "control" => Ok(Variant::A),
            "B" | "b" | "treatment" => Ok(Variant::B),
            other => Err(format!("Unknown variant: {}", other)),
        }
    }
}

/// One row of the raw orders table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub user_id: UserId,
    pub order_id: OrderId,
    /// 1-based position of the order in the user's history
    pub order_number: u32,
    /// Days since the user's previous order; absent for the first order
    pub days_since_prior_order: Option<f64>,
}

/// One row of the line-item table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub order_id: OrderId,
    pub item_count: u64,
}

/// Variant assignment for a single user. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub user_id: UserId,
    pub variant: Variant,
    pub assigned_at: NaiveDate,
}

/// An order placed on the reconstructed pseudo-timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub user_id: UserId,
    pub event_id: OrderId,
    /// Sequence number the event was ordered by
    pub sequence: u32,
    /// Whole days since the shared base date
    pub day_offset: u32,
    pub pseudo_event_date: NaiveDate,
    /// Items in the order (revenue proxy)
    pub items: u64,
}

/// An event that falls inside its user's outcome window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowedEvent {
    pub user_id: UserId,
    pub event_id: OrderId,
    pub pseudo_event_date: NaiveDate,
    pub items: u64,
    /// Whole days between assignment and the event, in `[0, window_days)`
    pub days_since_assignment: u32,
}

/// Per-user outcome inside the post-assignment window.
///
/// Exactly one exists per assignment row, including users without any
/// activity (all counts zero, all flags false).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOutcome {
    pub user_id: UserId,
    pub variant: Variant,
    pub assigned_at: NaiveDate,
    /// Window length used for this user
    pub window_days: u32,
    pub events_in_window: u64,
    /// Items ordered inside the window (ARPU proxy)
    pub volume_in_window: u64,
    pub converted: bool,
    /// Retention flag per checkpoint day
    pub retained: BTreeMap<u32, bool>,
    /// Orders in the pre-assignment lookback period
    pub pre_events: u64,
    /// Items in the pre-assignment lookback period (CUPED covariate)
    pub pre_volume: u64,
}

impl UserOutcome {
    /// Retention flag for a checkpoint, `None` if the checkpoint was not computed
    pub fn retained_at(&self, day: u32) -> Option<bool> {
        self.retained.get(&day).copied()
    }
}
