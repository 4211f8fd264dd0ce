//! Change capture: how source-collection writes reach the incremental
//! update operator.
//!
//! One of two strategies is active per deployment, chosen by
//! configuration:
//!
//! - **Reactive**: subscribe to the store's live write feed and run the
//!   incremental update for every observed event. Requires a store with
//!   transaction-log visibility.
//! - **Manual**: the write path calls [`ChangeNotifier::notify`] itself
//!   after committing an order.
//!
//! In both modes incremental failures are logged and discarded here, so
//! they never propagate back to the writer; the scheduled full rebuild
//! corrects any drift they leave behind.

use crate::engine::{IncrementalOutcome, ViewMaintainer};
use crate::error::{Error, Result};
use crate::store::{OrderChange, OrderStore};
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Deployment-time choice of change-capture strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCaptureMode {
    /// Subscribe to the store's change feed
    Reactive,
    /// The write path invokes the hook directly
    Manual,
}

impl std::str::FromStr for ChangeCaptureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reactive" => Ok(ChangeCaptureMode::Reactive),
            "manual" => Ok(ChangeCaptureMode::Manual),
            other => Err(Error::Configuration(format!(
                "unknown change capture mode '{other}' (expected 'reactive' or 'manual')"
            ))),
        }
    }
}

/// Strategy connecting source writes to the incremental update operator
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    /// Start background capture, if this strategy has any
    async fn start(&self) -> Result<()>;

    /// Write-path entry point, called after a source write commits.
    /// Fire-and-forget: failures are logged and never surface here.
    async fn notify(&self, change: &OrderChange);
}

/// Run the incremental update for one change, swallowing failures
async fn apply(maintainer: &ViewMaintainer, change: &OrderChange) {
    match maintainer.run_incremental_update(&change.order_id).await {
        Ok(IncrementalOutcome::Merged { rows }) => {
            debug!(order_id = %change.order_id, rows, op = ?change.op, "incremental update applied");
        }
        Ok(IncrementalOutcome::SourceMissing) => {
            debug!(order_id = %change.order_id, op = ?change.op, "source order gone; next rebuild will reconcile");
        }
        Err(e) => {
            // Deliberately discarded: the write path must not observe
            // maintenance failures, and the scheduled rebuild heals drift.
            error!(order_id = %change.order_id, error = %e, "incremental update failed");
        }
    }
}

/// Manual-mode hook: the external writer calls `notify` after each commit
pub struct ManualNotifier {
    maintainer: Arc<ViewMaintainer>,
}

impl ManualNotifier {
    pub fn new(maintainer: Arc<ViewMaintainer>) -> Self {
        Self { maintainer }
    }
}

#[async_trait]
impl ChangeNotifier for ManualNotifier {
    async fn start(&self) -> Result<()> {
        info!("change capture: manual mode; write path drives incremental updates");
        Ok(())
    }

    async fn notify(&self, change: &OrderChange) {
        apply(&self.maintainer, change).await;
    }
}

/// Reactive-mode hook: a background task consumes the store's write feed
pub struct ReactiveNotifier {
    maintainer: Arc<ViewMaintainer>,
    orders: Arc<dyn OrderStore>,
}

impl ReactiveNotifier {
    pub fn new(maintainer: Arc<ViewMaintainer>, orders: Arc<dyn OrderStore>) -> Self {
        Self { maintainer, orders }
    }
}

#[async_trait]
impl ChangeNotifier for ReactiveNotifier {
    async fn start(&self) -> Result<()> {
        let mut feed = self.orders.subscribe().ok_or_else(|| {
            Error::Configuration(
                "reactive change capture requires a store with a change feed".to_string(),
            )
        })?;
        let maintainer = Arc::clone(&self.maintainer);

        tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(change) => apply(&maintainer, &change).await,
                    Err(RecvError::Lagged(missed)) => {
                        // Missed events leave drift the next rebuild heals
                        warn!(missed, "change feed lagged; some incremental updates were dropped");
                    }
                    Err(RecvError::Closed) => {
                        info!("change feed closed; reactive capture stopped");
                        break;
                    }
                }
            }
        });

        info!("change capture: reactive mode; subscribed to the write feed");
        Ok(())
    }

    async fn notify(&self, change: &OrderChange) {
        // The feed already carries this event; nothing to do here
        debug!(order_id = %change.order_id, "reactive capture active; direct notification ignored");
    }
}

/// Build the notifier for the configured mode
pub fn change_notifier(
    mode: ChangeCaptureMode,
    maintainer: Arc<ViewMaintainer>,
    orders: Arc<dyn OrderStore>,
) -> Arc<dyn ChangeNotifier> {
    match mode {
        ChangeCaptureMode::Manual => Arc::new(ManualNotifier::new(maintainer)),
        ChangeCaptureMode::Reactive => Arc::new(ReactiveNotifier::new(maintainer, orders)),
    }
}
