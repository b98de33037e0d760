use serde::{Deserialize, Serialize};

/// Unique identifier for a product.
///
/// Wraps the numeric catalog id to provide type safety and prevent
/// mixing up product ids with other integer-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

impl ProductId {
    /// Creates a product ID from a raw catalog id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying integer id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ProductId> for i64 {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

/// Unique identifier for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    /// Creates an order ID from a raw order number.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying integer id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<OrderId> for i64 {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// A single line of an order: a product and the requested quantity.
///
/// This is the unit every reservation operation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub qty: i64,
}

impl OrderItem {
    /// Creates an order item for a product and quantity.
    pub fn new(product_id: impl Into<ProductId>, qty: i64) -> Self {
        Self {
            product_id: product_id.into(),
            qty,
        }
    }
}
