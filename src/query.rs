//! Filtered reads over the two view strategies.
//!
//! The "standard" strategy evaluates the aggregation pipeline per query;
//! the "materialized" strategy reads precomputed rows and reports their
//! freshness. [`compare`] runs both for the same filter and measures the
//! latency difference, which is the whole point of keeping the
//! materialized copy around.
//!
//! Consumers never see an error for staleness — the `last_updated`
//! metadata is the only signal that the materialized rows lag the source.

use crate::core::AggregateRow;
use crate::error::Result;
use crate::pipeline::AggregationPipeline;
use crate::store::{OrderStore, ViewFilter, ViewStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// Which strategy produced a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Standard,
    Materialized,
}

/// Per-query metadata, mirrored into comparison reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    pub view_type: ViewKind,
    #[serde(rename = "queryTimeMs")]
    pub elapsed_ms: u64,
    pub result_count: usize,
    /// Freshness stamp; standard-view results are always current and
    /// carry none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// A filtered result set plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub metadata: QueryMetadata,
    pub results: Vec<AggregateRow>,
}

/// Latency comparison between the two strategies for one filter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub standard: QueryMetadata,
    pub materialized: QueryMetadata,
    /// standard minus materialized; positive means the materialized view
    /// was faster
    pub time_difference_ms: i64,
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Aggregate on the fly and filter the result (the standard view)
pub async fn query_standard(
    orders: &dyn OrderStore,
    filter: &ViewFilter,
    limit: usize,
) -> Result<QueryOutcome> {
    let timer = Instant::now();
    let pipeline = AggregationPipeline::unscoped();
    let mut results: Vec<AggregateRow> = orders
        .run_pipeline(&pipeline)
        .await?
        .into_iter()
        .filter(|row| filter.matches(row))
        .collect();
    results.truncate(limit);

    Ok(QueryOutcome {
        metadata: QueryMetadata {
            view_type: ViewKind::Standard,
            elapsed_ms: elapsed_ms(timer),
            result_count: results.len(),
            last_updated: None,
        },
        results,
    })
}

/// Read precomputed rows from the materialized view
pub async fn query_materialized(
    view: &dyn ViewStore,
    filter: &ViewFilter,
    limit: usize,
) -> Result<QueryOutcome> {
    let timer = Instant::now();
    let results = view.query(filter, limit).await?;
    let last_updated = view.last_updated().await?;

    Ok(QueryOutcome {
        metadata: QueryMetadata {
            view_type: ViewKind::Materialized,
            elapsed_ms: elapsed_ms(timer),
            result_count: results.len(),
            last_updated,
        },
        results,
    })
}

/// Run both strategies for the same filter and report the latency delta
pub async fn compare(
    orders: &dyn OrderStore,
    view: &dyn ViewStore,
    filter: &ViewFilter,
    limit: usize,
) -> Result<(Comparison, QueryOutcome, QueryOutcome)> {
    let standard = query_standard(orders, filter, limit).await?;
    let materialized = query_materialized(view, filter, limit).await?;

    let comparison = Comparison {
        standard: standard.metadata,
        materialized: materialized.metadata,
        time_difference_ms: standard.metadata.elapsed_ms as i64
            - materialized.metadata.elapsed_ms as i64,
    };
    Ok((comparison, standard, materialized))
}
