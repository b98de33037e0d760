use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use tokio::sync::RwLock;

use crate::{
    LedgerError, Product, ReservationRow, Result,
    store::StockLedger,
};

#[derive(Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    reservations: Vec<ReservationRow>,
}

/// In-memory stock ledger implementation for testing.
///
/// This implementation keeps the catalog and reservation rows in memory
/// and provides the same observable semantics as the SQLite backend.
#[derive(Clone, Default)]
pub struct InMemoryStockLedger {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStockLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of reservation rows, released included.
    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    /// Clears the catalog and all reservation rows.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.products.clear();
        state.reservations.clear();
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn get_products(&self) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state.products.values().cloned().collect();
        products.sort_by_key(|p| p.product_id);
        Ok(products)
    }

    async fn upsert_product(&self, product: Product) -> Result<()> {
        self.state
            .write()
            .await
            .products
            .insert(product.product_id, product);
        Ok(())
    }

    async fn update_product_qty(&self, product_id: ProductId, new_qty: i64) -> Result<()> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&product_id) {
            Some(product) => {
                product.qty_available = new_qty;
                Ok(())
            }
            None => Err(LedgerError::ProductNotFound(product_id)),
        }
    }

    async fn insert_reservations(&self, rows: Vec<ReservationRow>) -> Result<()> {
        self.state.write().await.reservations.extend(rows);
        Ok(())
    }

    async fn release_reservations(
        &self,
        order_id: Option<OrderId>,
        product_ids: &[ProductId],
    ) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut affected = 0;
        for row in state.reservations.iter_mut() {
            if !row.released && row.order_id == order_id && product_ids.contains(&row.product_id) {
                row.released = true;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn live_reserved_totals(
        &self,
        now: DateTime<Utc>,
    ) -> Result<HashMap<ProductId, i64>> {
        let state = self.state.read().await;
        let mut totals = HashMap::new();
        for row in state.reservations.iter().filter(|r| r.is_live(now)) {
            *totals.entry(row.product_id).or_insert(0) += row.qty;
        }
        Ok(totals)
    }
}
