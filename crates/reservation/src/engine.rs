use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{Duration, Utc};
use common::{OrderId, OrderItem, ProductId};
use stock_ledger::{ReservationRow, StockLedger, StockLedgerExt};
use tokio::sync::{Mutex, RwLock};

use crate::{ReservationError, Result};

/// How long a hold stays live before it expires, in minutes.
///
/// One deployment-wide constant; never configured per product. Expiry is
/// evaluated lazily by whoever reads live reservations, there is no sweep.
pub const DEFAULT_RESERVATION_TTL_MINUTES: i64 = 15;

/// Inventory reservation engine over a stock ledger.
///
/// Holds the derived reserved-quantity aggregate and the per-product
/// deduction locks as instance state, so collaborators receive a shared
/// reference and tests can run isolated instances side by side.
pub struct ReservationEngine<L> {
    ledger: L,
    /// product id → quantity currently held by live reservations.
    /// Invariant: equals the ledger's live-reservation aggregate.
    reserved: RwLock<HashMap<ProductId, i64>>,
    /// Per-product locks serializing the read-modify-write of
    /// `qty_available` in `final_deduction`.
    deduct_locks: StdMutex<HashMap<ProductId, Arc<Mutex<()>>>>,
    ttl_minutes: i64,
}

impl<L: StockLedger> ReservationEngine<L> {
    /// Creates an engine with the default reservation TTL.
    pub fn new(ledger: L) -> Self {
        Self::with_ttl_minutes(ledger, DEFAULT_RESERVATION_TTL_MINUTES)
    }

    /// Creates an engine with an explicit TTL, in minutes.
    pub fn with_ttl_minutes(ledger: L, ttl_minutes: i64) -> Self {
        Self {
            ledger,
            reserved: RwLock::new(HashMap::new()),
            deduct_locks: StdMutex::new(HashMap::new()),
            ttl_minutes,
        }
    }

    /// Returns a reference to the underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Rebuilds the reserved-quantity aggregate from the ledger.
    ///
    /// Must run once at process start, before any other operation is
    /// trusted; concurrent calls are not supported. A crash loses nothing
    /// durable: the aggregate is always reconstructible from the ledger.
    #[tracing::instrument(skip(self))]
    pub async fn restore_reservations(&self) -> Result<()> {
        let totals = self.ledger.live_reserved_totals(Utc::now()).await?;
        let count = totals.len();
        *self.reserved.write().await = totals;
        tracing::info!(products = count, "reservations restored");
        Ok(())
    }

    /// Advisory availability check: `qty_available − reserved >= qty`.
    ///
    /// An unknown product yields `Ok(false)`, never a domain error; only
    /// ledger failures propagate. The answer can be stale by the time a
    /// caller acts on it; `reserve_items` re-checks.
    pub async fn validate_stock(&self, product_id: ProductId, qty: i64) -> Result<bool> {
        let Some(product) = self.ledger.get_product(product_id).await? else {
            return Ok(false);
        };
        Ok(product.qty_available - self.reserved_for(product_id).await >= qty)
    }

    /// Places a TTL-bound hold for every item, all-or-nothing.
    ///
    /// Two passes: every item is validated first (`ProductNotFound` and
    /// `InsufficientStock` fail before anything is written), then all
    /// rows are inserted in one ledger transaction with expiry
    /// `now + TTL`, and the aggregate is incremented. The two passes are
    /// deliberately not atomic against concurrent reservations on the
    /// same product; a racing caller can win the window between them.
    #[tracing::instrument(skip(self))]
    pub async fn reserve_items(
        &self,
        items: &[OrderItem],
        order_id: Option<OrderId>,
    ) -> Result<()> {
        let now = Utc::now();
        let expiry = now + Duration::minutes(self.ttl_minutes);

        let products = self.ledger.get_products().await?;
        for item in items {
            let product = products
                .iter()
                .find(|p| p.product_id == item.product_id)
                .ok_or(ReservationError::ProductNotFound(item.product_id))?;
            let available = product.qty_available - self.reserved_for(item.product_id).await;
            if available < item.qty {
                return Err(ReservationError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.qty,
                    available,
                });
            }
        }

        let rows: Vec<ReservationRow> = items
            .iter()
            .map(|item| ReservationRow::new(order_id, item.product_id, item.qty, now, expiry))
            .collect();
        self.ledger.insert_reservations(rows).await?;

        let mut reserved = self.reserved.write().await;
        for item in items {
            *reserved.entry(item.product_id).or_insert(0) += item.qty;
        }
        metrics::counter!("reservations_created").increment(items.len() as u64);

        Ok(())
    }

    /// Releases the holds matching `(order_id, product_id)` per item.
    ///
    /// Flips the matching unreleased rows in one ledger transaction, then
    /// decrements the aggregate by each item's quantity, clamped at zero.
    /// Idempotent per item: releasing an already-released or nonexistent
    /// hold is a silent no-op.
    #[tracing::instrument(skip(self))]
    pub async fn release_reservation(
        &self,
        items: &[OrderItem],
        order_id: Option<OrderId>,
    ) -> Result<()> {
        let product_ids: Vec<ProductId> = items.iter().map(|item| item.product_id).collect();
        let affected = self
            .ledger
            .release_reservations(order_id, &product_ids)
            .await?;

        let mut reserved = self.reserved.write().await;
        for item in items {
            let entry = reserved.entry(item.product_id).or_insert(0);
            *entry = (*entry - item.qty).max(0);
        }
        metrics::counter!("reservations_released").increment(affected);

        Ok(())
    }

    /// Permanently reduces `qty_available` for each item, one product at
    /// a time under that product's lock.
    ///
    /// Operations for the same product are totally ordered; different
    /// products never block each other. A `NegativeStock` failure aborts
    /// the rest of the batch but already-applied deductions stay
    /// committed.
    #[tracing::instrument(skip(self))]
    pub async fn final_deduction(&self, items: &[OrderItem]) -> Result<()> {
        for item in items {
            let lock = self.product_lock(item.product_id);
            // Guard drops on every exit path, so a failed deduction can
            // never deadlock later operations on this product.
            let _guard = lock.lock().await;

            let product = self
                .ledger
                .get_product(item.product_id)
                .await?
                .ok_or(ReservationError::ProductNotFound(item.product_id))?;

            let new_qty = product.qty_available - item.qty;
            if new_qty < 0 {
                metrics::counter!("deductions_failed").increment(1);
                return Err(ReservationError::NegativeStock {
                    product_id: item.product_id,
                    qty_available: product.qty_available,
                    requested: item.qty,
                });
            }

            self.ledger
                .update_product_qty(item.product_id, new_qty)
                .await?;
            tracing::info!(product_id = %item.product_id, new_qty, "final deduction applied");
            metrics::counter!("deductions_applied").increment(1);
        }
        Ok(())
    }

    /// Read-only copy of the reserved-quantity aggregate.
    pub async fn qty_reserved_snapshot(&self) -> HashMap<ProductId, i64> {
        self.reserved.read().await.clone()
    }

    async fn reserved_for(&self, product_id: ProductId) -> i64 {
        self.reserved
            .read()
            .await
            .get(&product_id)
            .copied()
            .unwrap_or(0)
    }

    fn product_lock(&self, product_id: ProductId) -> Arc<Mutex<()>> {
        let mut locks = self.deduct_locks.lock().unwrap();
        locks.entry(product_id).or_default().clone()
    }
}
