//! Store abstraction: source collection, destination collection, and the
//! optional change feed.
//!
//! The maintenance engine never reaches for a global connection; it is
//! handed trait objects for the two collections it touches. The source
//! collection is read-only from the engine's perspective and the
//! destination collection is exclusively owned by it — nothing else may
//! write aggregate rows, which is what makes merge-by-key safe.

pub mod memory;

use crate::core::{AggregateRow, Order, OrderId};
use crate::error::Result;
use crate::pipeline::AggregationPipeline;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

pub use memory::InMemoryStore;

/// Kind of write observed on the source collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
    Replace,
}

/// One source-collection write event, as carried by the change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderChange {
    pub op: ChangeOp,
    pub order_id: OrderId,
}

/// Filter over destination rows, as exposed to the query surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub category: Option<String>,
    pub city: Option<String>,
}

impl ViewFilter {
    pub fn matches(&self, row: &AggregateRow) -> bool {
        self.year.map_or(true, |y| row.year == y)
            && self.month.map_or(true, |m| row.month == m)
            && self.category.as_deref().map_or(true, |c| row.category == c)
            && self.city.as_deref().map_or(true, |c| row.city == c)
    }
}

/// Source-collection handle.
///
/// Writes come from an external writer (or the seeder/CLI standing in for
/// one); the engine itself only reads and aggregates.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Execute an aggregation pipeline against the collection
    async fn run_pipeline(&self, pipeline: &AggregationPipeline) -> Result<Vec<AggregateRow>>;

    /// Fetch one order's current state, if it still exists
    async fn get(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Commit an order (write path); emits a change-feed event
    async fn insert(&self, order: Order) -> Result<()>;

    /// Remove an order (external deletion); emits a change-feed event
    async fn remove(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Number of orders in the collection
    async fn count(&self) -> Result<usize>;

    /// Subscribe to the live write feed, if this deployment supports one
    fn subscribe(&self) -> Option<broadcast::Receiver<OrderChange>>;
}

/// Destination-collection handle, exclusively owned by the engine.
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Atomically replace the whole view with freshly computed rows.
    ///
    /// Readers observe either the previous complete view or the new one,
    /// never a partial state.
    async fn replace_all(&self, rows: Vec<AggregateRow>) -> Result<()>;

    /// Upsert rows by group key, replacing any existing row wholesale.
    /// Rows for unrelated keys are untouched.
    async fn merge(&self, rows: Vec<AggregateRow>) -> Result<()>;

    /// Filtered read, sorted year desc / month desc / total spent desc
    async fn query(&self, filter: &ViewFilter, limit: usize) -> Result<Vec<AggregateRow>>;

    /// Number of materialized rows
    async fn row_count(&self) -> Result<usize>;

    /// Freshest `last_updated` stamp across the view, if any rows exist
    async fn last_updated(&self) -> Result<Option<DateTime<Utc>>>;
}
