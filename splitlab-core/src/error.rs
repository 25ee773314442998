//! Error taxonomy
//!
//! Undefined statistics are not errors: they surface as `None` fields in the
//! results. Guardrail failures are not errors either: they are reported as
//! flags. What remains here are the conditions that stop an analysis.

use crate::model::{OrderId, UserId, Variant};
use thiserror::Error;

/// Invalid analysis parameters, raised before any computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Window length must be at least 1 day, got {0}")]
    InvalidWindow(i64),

    #[error("Split ratio must be strictly between 0 and 1, got {0}")]
    InvalidSplitRatio(f64),

    #[error("Significance level alpha must be strictly between 0 and 1, got {0}")]
    InvalidAlpha(f64),

    #[error("Target power must be strictly between 0 and 1, got {0}")]
    InvalidPower(f64),

    #[error("SRM threshold must be positive, got {0}")]
    InvalidSrmThreshold(f64),

    #[error("Bootstrap replicate count must be at least 1")]
    InvalidReplicates,

    #[error("Pre-period length cannot be negative, got {0}")]
    InvalidPrePeriod(i64),

    #[error("Target relative MDE must be positive, got {0}")]
    InvalidTargetMde(f64),

    #[error("Retention checkpoint day {day} is outside the {window_days}-day window")]
    CheckpointOutsideWindow { day: i64, window_days: u32 },

    #[error("Assignment salt must not be empty")]
    EmptySalt,

    #[error("Invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },
}

/// Inconsistent input or intermediate data; surfaced, never silently dropped
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataIntegrityError {
    #[error("User {user_id} is assigned to both {first} and {second}")]
    Contamination {
        user_id: UserId,
        first: Variant,
        second: Variant,
    },

    #[error("User {user_id} has more than one assignment row")]
    DuplicateAssignment { user_id: UserId },

    #[error("No outcome record for assigned user {user_id}")]
    MissingOutcome { user_id: UserId },

    #[error("User {user_id} has more than one outcome record")]
    DuplicateOutcome { user_id: UserId },

    #[error("Outcome record for user {user_id} who has no assignment")]
    UnassignedUser { user_id: UserId },

    #[error("Order {order_id} of user {user_id} has negative day delta {delta}")]
    NegativeDelta {
        user_id: UserId,
        order_id: OrderId,
        delta: f64,
    },

    #[error("Timeline of user {user_id} runs past the supported date range")]
    TimelineOverflow { user_id: UserId },
}

/// Failure reading an input table
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{table}: parse error at line {line}: {message}")]
    Parse {
        table: String,
        line: usize,
        message: String,
    },

    #[error("{table}: missing column '{column}'")]
    MissingColumn { table: String, column: String },
}

/// Anything that stops an analysis run
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Data integrity error: {0}")]
    DataIntegrity(#[from] DataIntegrityError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}
