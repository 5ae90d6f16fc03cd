//! Order domain types.
//!
//! Orders are intentionally minimal: the catalog cares about them only as a
//! write path that decrements stock and must invalidate product caches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mercato_core::{OrderId, ProductId};

/// One line of an order: a product and a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A request to place an order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub items: Vec<OrderLine>,
}

/// A placed order (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Ordered items.
    pub items: Vec<OrderLine>,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}
