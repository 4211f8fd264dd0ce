//! order-matview: main entry point

use clap::Parser;
use order_matview::cli::{Cli, Commands, ViewArg};
use order_matview::config::Config;
use order_matview::core::{LineItem, Order, OrderStatus, PaymentMethod, ShippingAddress};
use order_matview::engine::{
    change_notifier, ChangeCaptureMode, RefreshCadence, RefreshScheduler, ViewMaintainer,
};
use order_matview::error::Result;
use order_matview::store::{ChangeOp, InMemoryStore, OrderChange, OrderStore, ViewFilter, ViewStore};
use order_matview::{query, seed};
use chrono::{Datelike, Utc};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            orders,
            refresh_secs,
            capture,
            write_secs,
        } => serve(&config, orders, refresh_secs, capture, write_secs).await?,
        Commands::Rebuild { orders } => rebuild(orders).await?,
        Commands::Insert { orders } => insert(orders).await?,
        Commands::Query {
            view,
            orders,
            year,
            month,
            category,
            city,
            limit,
        } => {
            let filter = ViewFilter {
                year,
                month,
                category,
                city,
            };
            run_query(&config, view, orders, filter, limit).await?
        }
    }
    Ok(())
}

fn build_engine(store: &Arc<InMemoryStore>) -> Arc<ViewMaintainer> {
    Arc::new(ViewMaintainer::new(
        Arc::clone(store) as Arc<dyn OrderStore>,
        Arc::clone(store) as Arc<dyn ViewStore>,
    ))
}

async fn serve(
    config: &Config,
    orders: u64,
    refresh_secs: Option<u64>,
    capture: Option<ChangeCaptureMode>,
    write_secs: u64,
) -> Result<()> {
    let store = Arc::new(InMemoryStore::new());
    seed::seed(store.as_ref(), orders).await?;

    let maintainer = build_engine(&store);
    let report = maintainer.run_full_rebuild().await?;
    println!(
        "initial rebuild: {} rows from {} orders in {:?}",
        report.rows, report.source_orders, report.elapsed
    );

    let cadence = refresh_secs
        .map(|secs| RefreshCadence::Every(Duration::from_secs(secs)))
        .unwrap_or_else(|| config.cadence());
    let scheduler = RefreshScheduler::new(Arc::clone(&maintainer), cadence).spawn();

    let mode = capture.unwrap_or(config.capture_mode);
    let notifier = change_notifier(
        mode,
        Arc::clone(&maintainer),
        Arc::clone(&store) as Arc<dyn OrderStore>,
    );
    notifier.start().await?;

    let mut next_index = orders;
    let mut ticker = tokio::time::interval(Duration::from_secs(write_secs.max(1)));
    ticker.tick().await;

    println!("serving; writing a sample order every {write_secs}s, ctrl-c to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let order = seed::sample_order(next_index);
                next_index += 1;
                let id = order.id;
                store.insert(order).await?;
                if mode == ChangeCaptureMode::Manual {
                    notifier.notify(&OrderChange { op: ChangeOp::Insert, order_id: id }).await;
                }
                let rows = store.row_count().await?;
                println!("wrote order {id}; materialized rows: {rows}");
            }
        }
    }

    scheduler.abort();
    println!("shutting down");
    Ok(())
}

async fn rebuild(orders: u64) -> Result<()> {
    let store = Arc::new(InMemoryStore::new());
    seed::seed(store.as_ref(), orders).await?;

    let maintainer = build_engine(&store);
    let report = maintainer.run_full_rebuild().await?;
    println!(
        "rebuilt {} rows from {} orders in {:?} (stamp {})",
        report.rows, report.source_orders, report.elapsed, report.started
    );
    Ok(())
}

async fn insert(orders: u64) -> Result<()> {
    let store = Arc::new(InMemoryStore::new());
    seed::seed(store.as_ref(), orders).await?;

    let maintainer = build_engine(&store);
    maintainer.run_full_rebuild().await?;

    // A known two-line order: Electronics 2 x 500 and Books 1 x 30
    let order = Order::new(
        format!("ORD{}", Utc::now().timestamp_millis()),
        "CUST999",
        Utc::now(),
        OrderStatus::Pending,
        vec![
            LineItem::new("PROD001", "Test Product 1", "Electronics", 2, 500.0),
            LineItem::new("PROD002", "Test Product 2", "Books", 1, 30.0),
        ],
        ShippingAddress {
            street: "123 Test Street".to_string(),
            city: "New York".to_string(),
            country: "USA".to_string(),
            zip_code: "10001".to_string(),
        },
        PaymentMethod::CreditCard,
    );
    let id = order.id;
    let order_date = order.order_date;
    println!("inserting test order {id} for CUST999 (total 1030.00)");
    store.insert(order).await?;

    // Manual change-capture hook, as the write path would call it
    let notifier = change_notifier(
        ChangeCaptureMode::Manual,
        Arc::clone(&maintainer),
        Arc::clone(&store) as Arc<dyn OrderStore>,
    );
    notifier
        .notify(&OrderChange {
            op: ChangeOp::Insert,
            order_id: id,
        })
        .await;

    let filter = ViewFilter {
        year: Some(order_date.year()),
        month: Some(order_date.month()),
        city: Some("New York".to_string()),
        ..Default::default()
    };
    let rows = store.query(&filter, 100).await?;
    for row in rows.iter().filter(|r| r.customer_id == "CUST999") {
        println!("{}", serde_json::to_string_pretty(row)?);
    }
    Ok(())
}

async fn run_query(
    config: &Config,
    view: ViewArg,
    orders: u64,
    filter: ViewFilter,
    limit: Option<usize>,
) -> Result<()> {
    let store = Arc::new(InMemoryStore::new());
    seed::seed(store.as_ref(), orders).await?;

    let maintainer = build_engine(&store);
    maintainer.run_full_rebuild().await?;

    let limit = limit.unwrap_or(config.query_limit);
    match view {
        ViewArg::Standard => {
            let outcome = query::query_standard(store.as_ref(), &filter, limit).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        ViewArg::Materialized => {
            let outcome = query::query_materialized(store.as_ref(), &filter, limit).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        ViewArg::Compare => {
            let (comparison, _, _) =
                query::compare(store.as_ref(), store.as_ref(), &filter, limit).await?;
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
    }
    Ok(())
}
