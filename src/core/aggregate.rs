//! Destination-collection domain types: group keys and aggregate rows

use crate::core::order::{OrderStatus, PaymentMethod};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite key identifying one materialized row.
///
/// One order contributes one fact per line item, so an order with items in
/// two categories lands in two groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupKey {
    pub customer_id: String,
    pub year: i32,
    pub month: u32,
    pub category: String,
    pub city: String,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}-{:02}/{}/{}",
            self.customer_id, self.year, self.month, self.category, self.city
        )
    }
}

/// One destination row: metrics for a single [`GroupKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    pub customer_id: String,
    pub year: i32,
    pub month: u32,
    pub category: String,
    pub city: String,
    /// Count of contributing (order, line item) facts
    pub total_orders: u64,
    /// Sum of line totals, rounded to 2 decimals
    pub total_spent: f64,
    /// Mean of order-level totals across contributing facts, rounded to
    /// 2 decimals (see the pipeline docs for the per-line sampling quirk)
    pub avg_order_value: f64,
    /// Sum of line quantities
    pub total_quantity: u64,
    /// Count of distinct product identifiers
    pub unique_product_count: u64,
    /// Distinct payment methods seen, sorted
    pub payment_methods: Vec<PaymentMethod>,
    /// Distinct statuses seen, sorted
    pub order_statuses: Vec<OrderStatus>,
    /// total_quantity / total_orders, rounded to 2 decimals
    pub avg_items_per_order: f64,
    /// Refresh stamp; Some only on materialized rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl AggregateRow {
    /// The group key this row materializes
    pub fn key(&self) -> GroupKey {
        GroupKey {
            customer_id: self.customer_id.clone(),
            year: self.year,
            month: self.month,
            category: self.category.clone(),
            city: self.city.clone(),
        }
    }
}

/// Round to 2 decimal places, ties to even (the destination store's native
/// rounding mode)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
