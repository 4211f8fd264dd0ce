//! CLI commands

use crate::engine::ChangeCaptureMode;
use clap::{Parser, Subcommand, ValueEnum};

/// order-matview CLI
#[derive(Parser)]
#[command(name = "order-matview")]
#[command(about = "Materialized-view maintenance engine for order analytics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which view strategy to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    /// Aggregate on the fly per query
    Standard,
    /// Read precomputed rows
    Materialized,
    /// Run both and compare latency
    Compare,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Seed sample orders, start the refresh scheduler and change capture,
    /// and keep writing orders until interrupted
    Serve {
        /// Sample orders to seed before starting
        #[arg(long, default_value = "500")]
        orders: u64,
        /// Refresh interval in seconds (demo cadence); omit for the
        /// configured daily schedule
        #[arg(long)]
        refresh_secs: Option<u64>,
        /// Change-capture mode override
        #[arg(long, value_enum)]
        capture: Option<ChangeCaptureMode>,
        /// Seconds between demo writes
        #[arg(long, default_value = "2")]
        write_secs: u64,
    },
    /// Seed sample orders and run one full rebuild
    Rebuild {
        /// Sample orders to seed
        #[arg(long, default_value = "500")]
        orders: u64,
    },
    /// Insert a known two-line test order and push it through the manual
    /// change-capture hook
    Insert {
        /// Sample orders to seed first
        #[arg(long, default_value = "50")]
        orders: u64,
    },
    /// Query a view with optional dimension filters
    Query {
        /// Strategy to query
        #[arg(long, value_enum, default_value = "compare")]
        view: ViewArg,
        /// Sample orders to seed
        #[arg(long, default_value = "500")]
        orders: u64,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        city: Option<String>,
        /// Result-count limit
        #[arg(long)]
        limit: Option<usize>,
    },
}
