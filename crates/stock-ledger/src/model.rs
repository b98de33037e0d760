use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

/// A catalog entry with its authoritative stock count.
///
/// `qty_available` is mutated only by final deduction or by external
/// stock updates, never by reservation creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub title: String,
    pub price: Money,
    pub category: String,
    pub qty_available: i64,
    pub active: bool,
}

/// One reservation in the ledger: a temporary hold of `qty` units of a
/// product, optionally tied to an order.
///
/// Rows are soft-released (the `released` flag flips false to true) and
/// never deleted; an expired row is excluded by predicate when live
/// reservations are aggregated. The row id is store-assigned and not part
/// of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRow {
    /// `None` is a hold not yet tied to an order (cart stage); persisted
    /// as order id `0`.
    pub order_id: Option<OrderId>,
    pub product_id: ProductId,
    pub qty: i64,
    pub reserve_timestamp: DateTime<Utc>,
    pub expiry_timestamp: DateTime<Utc>,
    pub released: bool,
}

impl ReservationRow {
    /// Creates an unreleased reservation for `qty` units of a product.
    pub fn new(
        order_id: Option<OrderId>,
        product_id: ProductId,
        qty: i64,
        reserve_timestamp: DateTime<Utc>,
        expiry_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            product_id,
            qty,
            reserve_timestamp,
            expiry_timestamp,
            released: false,
        }
    }

    /// True while the row still counts toward the product's reserved total.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.released && self.expiry_timestamp > now
    }
}
