//! Aggregation pipeline: the grouping/projection logic behind the
//! materialized view.
//!
//! The pipeline is defined exactly once and shared by every caller: the
//! full rebuild runs it unscoped, the incremental update runs it scoped to
//! one order, and the standard-view query path runs it unscoped without a
//! refresh stamp. The only difference between those invocations is the
//! filter stage prepended before the unwind, so the two maintenance paths
//! can never drift apart in shape or semantics.

use crate::core::{round2, AggregateRow, GroupKey, Order, OrderId, OrderStatus, PaymentMethod};
use chrono::{DateTime, Datelike, Utc};
use std::collections::{BTreeSet, HashMap};

/// Input filter stage, applied before the unwind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Whole source collection
    All,
    /// A single order by identity
    Order(OrderId),
}

impl Scope {
    fn matches(&self, order: &Order) -> bool {
        match self {
            Scope::All => true,
            Scope::Order(id) => order.id == *id,
        }
    }
}

/// A declarative aggregation over the source collection.
///
/// Stages: filter (scope) → unwind line items → group by [`GroupKey`] →
/// reduce → project (with 2-decimal rounding) → sort.
#[derive(Debug, Clone)]
pub struct AggregationPipeline {
    /// Input filter
    pub scope: Scope,
    /// `last_updated` value projected onto every output row; `None` for
    /// on-the-fly (non-materialized) evaluation
    pub stamp: Option<DateTime<Utc>>,
}

/// Per-group reduction state
#[derive(Default)]
struct GroupAccumulator {
    total_orders: u64,
    total_spent: f64,
    /// Sum of order-level totals, one sample per contributing line item
    amount_sum: f64,
    total_quantity: u64,
    products: BTreeSet<String>,
    payment_methods: BTreeSet<PaymentMethod>,
    statuses: BTreeSet<OrderStatus>,
}

impl AggregationPipeline {
    /// Pipeline over the whole source collection
    pub fn unscoped() -> Self {
        Self {
            scope: Scope::All,
            stamp: None,
        }
    }

    /// Pipeline filtered to a single order's current state
    pub fn scoped(id: OrderId) -> Self {
        Self {
            scope: Scope::Order(id),
            stamp: None,
        }
    }

    /// Project the given refresh stamp onto every output row
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.stamp = Some(at);
        self
    }

    /// Execute the pipeline over a stream of orders.
    ///
    /// Pure: the output depends only on the input orders and this
    /// pipeline's parameters.
    ///
    /// Note the documented averaging quirk: `avg_order_value` samples the
    /// *order-level* `total_amount` once per line item the order
    /// contributes, so an order with N items weighs N times into the mean.
    /// This replicates the view's historical semantics and is relied on by
    /// downstream consumers; do not "fix" it here.
    pub fn execute<'a, I>(&self, orders: I) -> Vec<AggregateRow>
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut groups: HashMap<GroupKey, GroupAccumulator> = HashMap::new();

        for order in orders.into_iter().filter(|o| self.scope.matches(o)) {
            // Unwind: one fact per (order, line item) pair
            for item in &order.items {
                let key = GroupKey {
                    customer_id: order.customer_id.clone(),
                    year: order.order_date.year(),
                    month: order.order_date.month(),
                    category: item.category.clone(),
                    city: order.shipping_address.city.clone(),
                };

                let acc = groups.entry(key).or_default();
                acc.total_orders += 1;
                acc.total_spent += item.total_price;
                acc.amount_sum += order.total_amount;
                acc.total_quantity += u64::from(item.quantity);
                acc.products.insert(item.product_id.clone());
                acc.payment_methods.insert(order.payment_method);
                acc.statuses.insert(order.status);
            }
        }

        let mut rows: Vec<AggregateRow> = groups
            .into_iter()
            .map(|(key, acc)| self.project(key, acc))
            .collect();

        // year desc, month desc, total spent desc
        rows.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then(b.month.cmp(&a.month))
                .then(b.total_spent.total_cmp(&a.total_spent))
        });

        rows
    }

    fn project(&self, key: GroupKey, acc: GroupAccumulator) -> AggregateRow {
        let total_orders = acc.total_orders;
        AggregateRow {
            customer_id: key.customer_id,
            year: key.year,
            month: key.month,
            category: key.category,
            city: key.city,
            total_orders,
            total_spent: round2(acc.total_spent),
            avg_order_value: round2(acc.amount_sum / total_orders as f64),
            total_quantity: acc.total_quantity,
            unique_product_count: acc.products.len() as u64,
            payment_methods: acc.payment_methods.into_iter().collect(),
            order_statuses: acc.statuses.into_iter().collect(),
            avg_items_per_order: round2(acc.total_quantity as f64 / total_orders as f64),
            last_updated: self.stamp,
        }
    }
}
