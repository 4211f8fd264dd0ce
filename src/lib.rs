//! order-matview: materialized-view maintenance for order analytics
//!
//! An append-heavy order collection is aggregated into a per-customer,
//! per-month, per-category, per-city summary. The summary exists in two
//! forms: a "standard view" computed per query, and a "materialized view"
//! kept by this engine and exposed for fast reads.
//!
//! # Core Concepts
//!
//! - **Aggregation pipeline**: one parameterized definition of the
//!   grouping logic, shared by every derivation path
//! - **Full rebuild**: recompute everything and atomically swap the
//!   destination collection
//! - **Incremental update**: recompute just the groups one changed order
//!   touches and merge them in
//! - **Refresh scheduler**: daily full rebuild that heals drift and
//!   reflects deletions
//! - **Change capture**: reactive (store change feed) or manual
//!   (write-path hook) delivery of changes to the incremental path
//!
//! The materialized view is eventually consistent: an individual write is
//! usually reflected within seconds via the incremental path, and any
//! record converges to full accuracy within one refresh interval.
//!
//! # Example
//!
//! ```no_run
//! use order_matview::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> order_matview::error::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let engine = ViewMaintainer::new(
//!     Arc::clone(&store) as Arc<dyn OrderStore>,
//!     Arc::clone(&store) as Arc<dyn ViewStore>,
//! );
//!
//! // Materialize the whole collection
//! engine.run_full_rebuild().await?;
//!
//! // Reflect one new order without touching unrelated groups
//! let order = order_matview::seed::sample_order(0);
//! let id = order.id;
//! store.insert(order).await?;
//! engine.run_incremental_update(&id).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod seed;
pub mod store;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::core::*;
    pub use crate::engine::{
        change_notifier, ChangeCaptureMode, ChangeNotifier, IncrementalOutcome, RebuildReport,
        RefreshCadence, RefreshScheduler, ViewMaintainer,
    };
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{AggregationPipeline, Scope};
    pub use crate::store::*;
}
