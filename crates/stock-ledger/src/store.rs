use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};

use crate::{Product, ReservationRow, Result};

/// Core trait for stock ledger backends.
///
/// A ledger persists the product catalog and the reservation history.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Returns the current catalog with authoritative `qty_available`.
    async fn get_products(&self) -> Result<Vec<Product>>;

    /// Inserts or replaces a catalog entry.
    ///
    /// This is the external stock-update path; reservation operations
    /// never go through it.
    async fn upsert_product(&self, product: Product) -> Result<()>;

    /// Sets the authoritative quantity for a product.
    ///
    /// Fails with `ProductNotFound` if the product is unknown.
    async fn update_product_qty(&self, product_id: ProductId, new_qty: i64) -> Result<()>;

    /// Inserts reservation rows atomically.
    ///
    /// All rows of a call commit together or not at all.
    async fn insert_reservations(&self, rows: Vec<ReservationRow>) -> Result<()>;

    /// Marks unreleased reservations matching `(order_id, product_id)`
    /// as released, for each given product, in one store transaction.
    ///
    /// Returns the number of rows affected; zero matches is not an error.
    async fn release_reservations(
        &self,
        order_id: Option<OrderId>,
        product_ids: &[ProductId],
    ) -> Result<u64>;

    /// Aggregates the live reservation quantities per product: the sum of
    /// `qty` over rows where `released = false` and `expiry > now`.
    async fn live_reserved_totals(&self, now: DateTime<Utc>)
    -> Result<HashMap<ProductId, i64>>;
}

/// Extension trait providing convenience methods for ledgers.
#[async_trait]
pub trait StockLedgerExt: StockLedger {
    /// Looks up a single product by id.
    ///
    /// Returns None if the product is not in the catalog.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self
            .get_products()
            .await?
            .into_iter()
            .find(|p| p.product_id == product_id))
    }
}

// Blanket implementation for all StockLedger implementations
impl<T: StockLedger + ?Sized> StockLedgerExt for T {}
