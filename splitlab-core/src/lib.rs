#![warn(missing_docs)]
//! Splitlab Core - Cohorts and Outcomes
//!
//! This crate turns raw order logs into one outcome record per assigned user:
//! - Deterministic salted-hash variant assignment
//! - Pseudo-timeline reconstruction from relative day deltas
//! - Half-open outcome window filtering
//! - Left-outer outcome aggregation (zero-activity users are kept)
//!
//! It also owns the validated analysis configuration and the error taxonomy
//! shared by every other splitlab crate.

mod assignment;
mod config;
mod error;
mod model;
mod outcome;
mod source;
mod timeline;
mod window;

pub use assignment::{assign_users, assign_variant, assignment_bucket};
pub use config::{
    AnalysisConfig, AssignmentConfig, InferenceConfig, OutcomeConfig, ResamplingConfig,
    DEFAULT_RETENTION_CHECKPOINTS, DEFAULT_WINDOW_DAYS,
};
pub use error::{AnalysisError, ConfigError, DataIntegrityError, SourceError};
pub use model::{
    Assignment, EventRecord, LineItem, OrderId, OrderRecord, UserId, UserOutcome, Variant,
    WindowedEvent,
};
pub use outcome::{aggregate_outcomes, verify_outcomes};
pub use source::{InMemorySource, OrderSource};
pub use timeline::build_timeline;
pub use window::{filter_window, window_end};
