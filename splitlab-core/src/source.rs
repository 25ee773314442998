//! Read-only access to the order log.

use crate::error::SourceError;
use crate::model::{Assignment, LineItem, OrderRecord};

/// Tabular source of raw orders and line items.
///
/// Implementations only read; the storage and query language behind them are
/// not the engine's concern.
pub trait OrderSource {
    /// All rows of the orders table
    fn orders(&self) -> Result<Vec<OrderRecord>, SourceError>;

    /// All rows of the line-item table
    fn line_items(&self) -> Result<Vec<LineItem>, SourceError>;

    /// Assignment rows recorded by earlier runs of the same experiment.
    ///
    /// Checked together with the fresh assignments for contamination.
    fn assignment_history(&self) -> Result<Vec<Assignment>, SourceError> {
        Ok(Vec::new())
    }
}

/// Source backed by vectors already in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub orders: Vec<OrderRecord>,
    pub line_items: Vec<LineItem>,
    pub history: Vec<Assignment>,
}

impl InMemorySource {
    /// Create a source without assignment history
    pub fn new(orders: Vec<OrderRecord>, line_items: Vec<LineItem>) -> Self {
        Self {
            orders,
            line_items,
            history: Vec::new(),
        }
    }

    /// Attach previously recorded assignments
    pub fn with_history(mut self, history: Vec<Assignment>) -> Self {
        self.history = history;
        self
    }
}

impl OrderSource for InMemorySource {
    fn orders(&self) -> Result<Vec<OrderRecord>, SourceError> {
        Ok(self.orders.clone())
    }

    fn line_items(&self) -> Result<Vec<LineItem>, SourceError> {
        Ok(self.line_items.clone())
    }

    fn assignment_history(&self) -> Result<Vec<Assignment>, SourceError> {
        Ok(self.history.clone())
    }
}
