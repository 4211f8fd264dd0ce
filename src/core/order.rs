//! Source-collection domain types: orders and their line items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId {
    /// UUID of the order
    pub id: Uuid,
}

impl OrderId {
    /// Generate a new order ID
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self { id: uuid }
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Order fulfillment status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// Payment method used for an order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    BankTransfer,
}

/// One line of an order: a product, quantity, and pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product identifier
    pub product_id: String,
    /// Product display name
    pub product_name: String,
    /// Product category (aggregation dimension)
    pub category: String,
    /// Quantity ordered
    pub quantity: u32,
    /// Price per unit
    pub unit_price: f64,
    /// Line total; the writer guarantees quantity * unit_price
    pub total_price: f64,
}

impl LineItem {
    /// Create a line item, deriving the line total from quantity and unit price
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        category: impl Into<String>,
        quantity: u32,
        unit_price: f64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            category: category.into(),
            quantity,
            unit_price,
            total_price: f64::from(quantity) * unit_price,
        }
    }
}

/// Shipping destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    /// City (aggregation dimension)
    pub city: String,
    pub country: String,
    pub zip_code: String,
}

/// A source-collection order.
///
/// Orders are written by an external writer and are immutable once written
/// from the engine's point of view: the maintenance engine only ever reads
/// them. Deletion is an external event the engine tolerates; an incremental
/// update for a missing order is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique identifier
    pub id: OrderId,
    /// Human-readable order reference ("ORD...")
    pub order_ref: String,
    /// Customer identifier (aggregation dimension)
    pub customer_id: String,
    /// When the order was placed; year/month are aggregation dimensions
    pub order_date: DateTime<Utc>,
    /// Fulfillment status
    pub status: OrderStatus,
    /// Ordered line items
    pub items: Vec<LineItem>,
    /// Order-level total; the writer guarantees the sum of line totals
    pub total_amount: f64,
    /// Shipping destination
    pub shipping_address: ShippingAddress,
    /// Payment method
    pub payment_method: PaymentMethod,
}

impl Order {
    /// Create an order, deriving the order total from its line items
    pub fn new(
        order_ref: impl Into<String>,
        customer_id: impl Into<String>,
        order_date: DateTime<Utc>,
        status: OrderStatus,
        items: Vec<LineItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Self {
        let total_amount = items.iter().map(|i| i.total_price).sum();
        Self {
            id: OrderId::new(),
            order_ref: order_ref.into(),
            customer_id: customer_id.into(),
            order_date,
            status,
            items,
            total_amount,
            shipping_address,
            payment_method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_line_item_total() {
        let item = LineItem::new("PROD001", "Widget", "Electronics", 3, 19.99);
        assert!((item.total_price - 59.97).abs() < 1e-9);
    }

    #[test]
    fn test_order_total_is_sum_of_line_totals() {
        let items = vec![
            LineItem::new("PROD001", "Widget", "Electronics", 2, 500.0),
            LineItem::new("PROD002", "Paperback", "Books", 1, 30.0),
        ];
        let order = Order::new(
            "ORD1",
            "CUST001",
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            OrderStatus::Pending,
            items,
            ShippingAddress {
                street: "123 Test Street".to_string(),
                city: "New York".to_string(),
                country: "USA".to_string(),
                zip_code: "10001".to_string(),
            },
            PaymentMethod::CreditCard,
        );
        assert!((order.total_amount - 1030.0).abs() < 1e-9);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let json = serde_json::to_string(&PaymentMethod::CreditCard).unwrap();
        assert_eq!(json, "\"credit_card\"");
    }
}
