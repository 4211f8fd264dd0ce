//! Deterministic sample-data generation.
//!
//! Stands in for the external writer when demoing or testing the engine:
//! a fixed catalog of customers, products, and cities, with a splitmix64
//! hash of the sequence index driving every choice so identical calls
//! produce identical orders.

use crate::core::{LineItem, Order, OrderStatus, PaymentMethod, ShippingAddress};
use crate::error::Result;
use crate::store::OrderStore;
use chrono::{Duration, TimeZone, Utc};
use tracing::info;

const CATEGORIES: [&str; 5] = ["Electronics", "Clothing", "Books", "Home", "Food"];
const CITIES: [&str; 5] = ["New York", "Los Angeles", "Chicago", "Houston", "Phoenix"];
const STATUSES: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];
const PAYMENT_METHODS: [PaymentMethod; 4] = [
    PaymentMethod::CreditCard,
    PaymentMethod::DebitCard,
    PaymentMethod::Paypal,
    PaymentMethod::BankTransfer,
];

/// splitmix64 step; a cheap, well-mixed hash of the sequence counter
fn mix(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn pick(seed: u64, salt: u64, bound: u64) -> u64 {
    mix(seed.wrapping_mul(0x100).wrapping_add(salt)) % bound
}

/// Generate the `index`-th sample order. Deterministic in `index`.
pub fn sample_order(index: u64) -> Order {
    let customer = pick(index, 1, 100) + 1;
    let num_items = pick(index, 2, 4) + 1;

    let items: Vec<LineItem> = (0..num_items)
        .map(|n| {
            let salt = 10 + n * 4;
            let product = pick(index, salt, 50) + 1;
            let category = CATEGORIES[pick(index, salt + 1, 5) as usize];
            let quantity = (pick(index, salt + 2, 3) + 1) as u32;
            let unit_price = (pick(index, salt + 3, 900) + 100) as f64;
            LineItem::new(
                format!("PROD{product:03}"),
                format!("Product {product}"),
                category,
                quantity,
                unit_price,
            )
        })
        .collect();

    // Spread orders over the 36 months before a fixed anchor date
    let anchor = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
    let days_back = pick(index, 3, 36 * 30) as i64;
    let order_date = anchor - Duration::days(days_back);

    Order::new(
        format!("ORD{index:06}"),
        format!("CUST{customer:03}"),
        order_date,
        STATUSES[pick(index, 4, 5) as usize],
        items,
        ShippingAddress {
            street: format!("{} Main St", pick(index, 5, 999) + 1),
            city: CITIES[pick(index, 6, 5) as usize].to_string(),
            country: "USA".to_string(),
            zip_code: format!("{}", pick(index, 7, 90_000) + 10_000),
        },
        PAYMENT_METHODS[pick(index, 8, 4) as usize],
    )
}

/// Insert `count` sample orders into the source collection
pub async fn seed(orders: &dyn OrderStore, count: u64) -> Result<()> {
    for index in 0..count {
        orders.insert(sample_order(index)).await?;
    }
    info!(count, "seeded sample orders");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn test_generation_is_deterministic() {
        let a = sample_order(42);
        let b = sample_order(42);
        // Ids are freshly generated; everything else must match
        assert_eq!(a.order_ref, b.order_ref);
        assert_eq!(a.customer_id, b.customer_id);
        assert_eq!(a.order_date, b.order_date);
        assert_eq!(a.items, b.items);
        assert_eq!(a.total_amount, b.total_amount);
    }

    #[test]
    fn test_orders_vary_across_indices() {
        let refs: std::collections::HashSet<String> =
            (0..50).map(|i| sample_order(i).customer_id).collect();
        assert!(refs.len() > 1);
    }

    #[test]
    fn test_invariants_hold() {
        for i in 0..100 {
            let order = sample_order(i);
            assert!(!order.items.is_empty());
            for item in &order.items {
                assert!((item.total_price - f64::from(item.quantity) * item.unit_price).abs() < 1e-9);
            }
            let sum: f64 = order.items.iter().map(|i| i.total_price).sum();
            assert!((order.total_amount - sum).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_seed_inserts_into_store() {
        let store = InMemoryStore::new();
        seed(&store, 25).await.unwrap();
        assert_eq!(OrderStore::count(&store).await.unwrap(), 25);
    }
}
