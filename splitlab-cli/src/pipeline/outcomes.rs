//! Outcome Stage
//!
//! Raw tables to one [`UserOutcome`] per assigned user:
//! timeline, assignment, window filter, aggregation and the totality check.

use splitlab_core::{
    aggregate_outcomes, assign_users, build_timeline, filter_window, verify_outcomes,
    AnalysisConfig, AnalysisError, Assignment, OrderSource, UserOutcome,
};
use tracing::{debug, info};

/// Everything the inference stage needs from the data
#[derive(Debug, Clone)]
pub struct OutcomeSet {
    /// Assignments made by this run
    pub assignments: Vec<Assignment>,
    /// Recorded assignments followed by this run's assignments
    pub history: Vec<Assignment>,
    pub outcomes: Vec<UserOutcome>,
}

/// Build per-user outcomes from a source.
///
/// Every user with at least one order is assigned; users are taken in order
/// of first appearance in the orders table.
pub fn compute_outcomes(
    source: &dyn OrderSource,
    config: &AnalysisConfig,
) -> Result<OutcomeSet, AnalysisError> {
    let orders = source.orders()?;
    let line_items = source.line_items()?;
    info!(orders = orders.len(), line_items = line_items.len(), "Loaded source tables");

    let events = build_timeline(&orders, &line_items, config.base_date)?;
    debug!(events = events.len(), "Built pseudo-timeline");

    let assignments = assign_users(orders.iter().map(|o| o.user_id), &config.assignment);
    info!(users = assignments.len(), "Assigned users");

    let windowed = filter_window(&assignments, &events, config.outcome.window_days);
    debug!(
        windowed = windowed.len(),
        window_days = config.outcome.window_days,
        "Filtered events to outcome window"
    );

    let outcomes = aggregate_outcomes(&assignments, &windowed, &events, &config.outcome)?;
    verify_outcomes(&assignments, &outcomes)?;
    info!(outcomes = outcomes.len(), "Aggregated user outcomes");

    let mut history = source.assignment_history()?;
    history.extend(assignments.iter().copied());

    Ok(OutcomeSet {
        assignments,
        history,
        outcomes,
    })
}
