//! In-memory implementation of the source and destination collections.
//!
//! The destination map is swapped wholesale under a single write guard, so
//! the `replace_all` primitive is atomic with respect to readers: a query
//! either sees the previous complete view or the new complete view.

use crate::core::{AggregateRow, GroupKey, Order, OrderId};
use crate::error::Result;
use crate::pipeline::AggregationPipeline;
use crate::store::{ChangeOp, OrderChange, OrderStore, ViewFilter, ViewStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

/// Capacity of the change-feed channel; slow subscribers see `Lagged`
const CHANGE_FEED_CAPACITY: usize = 256;

/// In-memory store backing both collections and the change feed
pub struct InMemoryStore {
    /// Source collection: order id -> order
    orders: RwLock<HashMap<OrderId, Order>>,
    /// Destination collection: group key -> materialized row
    view: RwLock<HashMap<GroupKey, AggregateRow>>,
    /// Live write feed over the source collection
    changes: broadcast::Sender<OrderChange>,
    /// Whether `subscribe` hands out feed receivers
    feed_enabled: bool,
}

impl InMemoryStore {
    /// Create a store with the change feed enabled
    pub fn new() -> Self {
        Self::with_feed(true)
    }

    /// Create a store, choosing change-feed availability.
    ///
    /// A disabled feed models deployments without transaction-log
    /// visibility, where only the manual change-capture mode works.
    pub fn with_feed(feed_enabled: bool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            orders: RwLock::new(HashMap::new()),
            view: RwLock::new(HashMap::new()),
            changes,
            feed_enabled,
        }
    }

    fn emit(&self, op: ChangeOp, order_id: OrderId) {
        // No receivers is fine; the feed is best-effort
        let _ = self.changes.send(OrderChange { op, order_id });
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn run_pipeline(&self, pipeline: &AggregationPipeline) -> Result<Vec<AggregateRow>> {
        let orders = self.orders.read().await;
        Ok(pipeline.execute(orders.values()))
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn insert(&self, order: Order) -> Result<()> {
        let id = order.id;
        let previous = self.orders.write().await.insert(id, order);
        let op = if previous.is_some() {
            ChangeOp::Replace
        } else {
            ChangeOp::Insert
        };
        self.emit(op, id);
        Ok(())
    }

    async fn remove(&self, id: &OrderId) -> Result<Option<Order>> {
        let removed = self.orders.write().await.remove(id);
        if removed.is_some() {
            self.emit(ChangeOp::Delete, *id);
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.orders.read().await.len())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<OrderChange>> {
        self.feed_enabled.then(|| self.changes.subscribe())
    }
}

#[async_trait]
impl ViewStore for InMemoryStore {
    async fn replace_all(&self, rows: Vec<AggregateRow>) -> Result<()> {
        // Stage the full map before taking the lock; the swap itself is a
        // single assignment under the write guard.
        let staged: HashMap<GroupKey, AggregateRow> =
            rows.into_iter().map(|row| (row.key(), row)).collect();
        *self.view.write().await = staged;
        Ok(())
    }

    async fn merge(&self, rows: Vec<AggregateRow>) -> Result<()> {
        let mut view = self.view.write().await;
        for row in rows {
            view.insert(row.key(), row);
        }
        Ok(())
    }

    async fn query(&self, filter: &ViewFilter, limit: usize) -> Result<Vec<AggregateRow>> {
        let view = self.view.read().await;
        let mut rows: Vec<AggregateRow> = view
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then(b.month.cmp(&a.month))
                .then(b.total_spent.total_cmp(&a.total_spent))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn row_count(&self) -> Result<usize> {
        Ok(self.view.read().await.len())
    }

    async fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .view
            .read()
            .await
            .values()
            .filter_map(|row| row.last_updated)
            .max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LineItem, OrderStatus, PaymentMethod, ShippingAddress};
    use chrono::TimeZone;

    fn sample_order(customer: &str, category: &str) -> Order {
        Order::new(
            "ORD1",
            customer,
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            OrderStatus::Pending,
            vec![LineItem::new("PROD001", "Widget", category, 1, 50.0)],
            ShippingAddress {
                street: "1 Main St".to_string(),
                city: "Chicago".to_string(),
                country: "USA".to_string(),
                zip_code: "60601".to_string(),
            },
            PaymentMethod::CreditCard,
        )
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let store = InMemoryStore::new();
        let order = sample_order("CUST001", "Home");
        let id = order.id;

        store.insert(order.clone()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(&id).await.unwrap(), Some(order));

        let removed = store.remove(&id).await.unwrap();
        assert!(removed.is_some());
        assert_eq!(store.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_change_feed_ops() {
        let store = InMemoryStore::new();
        let mut feed = store.subscribe().unwrap();

        let order = sample_order("CUST001", "Home");
        let id = order.id;
        store.insert(order.clone()).await.unwrap();
        store.insert(order).await.unwrap();
        store.remove(&id).await.unwrap();

        assert_eq!(
            feed.recv().await.unwrap(),
            OrderChange {
                op: ChangeOp::Insert,
                order_id: id
            }
        );
        assert_eq!(feed.recv().await.unwrap().op, ChangeOp::Replace);
        assert_eq!(feed.recv().await.unwrap().op, ChangeOp::Delete);
    }

    #[tokio::test]
    async fn test_feed_can_be_disabled() {
        let store = InMemoryStore::with_feed(false);
        assert!(store.subscribe().is_none());
        // Writes still succeed without subscribers
        store.insert(sample_order("CUST001", "Home")).await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_all_swaps_wholesale() {
        let store = InMemoryStore::new();
        let a = sample_order("CUST001", "Home");
        let b = sample_order("CUST002", "Books");

        let rows = AggregationPipeline::unscoped().execute([&a]);
        store.replace_all(rows).await.unwrap();
        assert_eq!(store.row_count().await.unwrap(), 1);

        let rows = AggregationPipeline::unscoped().execute([&b]);
        store.replace_all(rows).await.unwrap();
        let remaining = store.query(&ViewFilter::default(), 100).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].customer_id, "CUST002");
    }

    #[tokio::test]
    async fn test_merge_leaves_unrelated_rows_alone() {
        let store = InMemoryStore::new();
        let a = sample_order("CUST001", "Home");
        let b = sample_order("CUST002", "Books");

        store
            .replace_all(AggregationPipeline::unscoped().execute([&a]))
            .await
            .unwrap();
        store
            .merge(AggregationPipeline::unscoped().execute([&b]))
            .await
            .unwrap();

        assert_eq!(store.row_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_filter_and_limit() {
        let store = InMemoryStore::new();
        let a = sample_order("CUST001", "Home");
        let b = sample_order("CUST002", "Books");
        store
            .replace_all(AggregationPipeline::unscoped().execute([&a, &b]))
            .await
            .unwrap();

        let filter = ViewFilter {
            category: Some("Books".to_string()),
            ..Default::default()
        };
        let rows = store.query(&filter, 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Books");

        let rows = store.query(&ViewFilter::default(), 1).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
