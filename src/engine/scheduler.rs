//! Periodic full refresh of the materialized view.
//!
//! The scheduler fires on a fixed cadence regardless of incremental
//! traffic. Each tick runs a full rebuild, which heals any drift left by
//! incremental merges and reflects deletions the merge path cannot see.

use crate::engine::ViewMaintainer;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// When the scheduler fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshCadence {
    /// Once per day at the given UTC wall-clock time
    DailyAt { hour: u32, minute: u32 },
    /// Fixed interval between ticks (demo and test cadence)
    Every(Duration),
}

impl RefreshCadence {
    /// Default production cadence: daily at midnight UTC
    pub fn midnight() -> Self {
        RefreshCadence::DailyAt { hour: 0, minute: 0 }
    }

    /// The next tick strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            RefreshCadence::DailyAt { hour, minute } => {
                let today = now
                    .date_naive()
                    .and_hms_opt(hour, minute, 0)
                    .map(|naive| Utc.from_utc_datetime(&naive))
                    .unwrap_or(now);
                if today > now {
                    today
                } else {
                    today + ChronoDuration::days(1)
                }
            }
            RefreshCadence::Every(interval) => {
                now + ChronoDuration::from_std(interval).unwrap_or_else(|_| ChronoDuration::days(1))
            }
        }
    }
}

/// Recurring timer that drives the full rebuild.
///
/// Overlap policy: if a rebuild spawned by a previous tick is still in
/// flight, the tick is skipped and logged. A failed rebuild is logged at
/// error level; the next tick stays on the fixed cadence either way.
pub struct RefreshScheduler {
    maintainer: Arc<ViewMaintainer>,
    cadence: RefreshCadence,
    rebuild_in_flight: Arc<AtomicBool>,
}

impl RefreshScheduler {
    pub fn new(maintainer: Arc<ViewMaintainer>, cadence: RefreshCadence) -> Self {
        Self {
            maintainer,
            cadence,
            rebuild_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a scheduled rebuild is currently running
    pub fn rebuild_in_flight(&self) -> bool {
        self.rebuild_in_flight.load(Ordering::SeqCst)
    }

    /// Run one tick: spawn a rebuild unless one is still in flight.
    ///
    /// Returns false when the tick was skipped.
    pub fn tick(&self) -> bool {
        if self.rebuild_in_flight.swap(true, Ordering::SeqCst) {
            warn!("scheduled refresh skipped: previous rebuild still in flight");
            return false;
        }

        let maintainer = Arc::clone(&self.maintainer);
        let guard = Arc::clone(&self.rebuild_in_flight);
        tokio::spawn(async move {
            match maintainer.run_full_rebuild().await {
                Ok(report) => info!(
                    rows = report.rows,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "scheduled refresh complete"
                ),
                Err(e) => error!(error = %e, "scheduled refresh failed"),
            }
            guard.store(false, Ordering::SeqCst);
        });
        true
    }

    /// Spawn the scheduling loop.
    ///
    /// The loop sleeps until each tick and never terminates on its own;
    /// drop or abort the handle to stop it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(cadence = ?self.cadence, "refresh scheduler started");
            loop {
                let now = Utc::now();
                let next = self.cadence.next_after(now);
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;
                self.tick();
            }
        })
    }
}
