use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::{
    LedgerError, Product, ReservationRow, Result,
    store::StockLedger,
};

/// SQLite-backed stock ledger.
#[derive(Clone)]
pub struct SqliteStockLedger {
    pool: SqlitePool,
}

impl SqliteStockLedger {
    /// Creates a ledger over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the database at `url`, creating the file if missing.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        tracing::debug!(url, "stock ledger connected");
        Ok(Self { pool })
    }

    /// Opens a private in-memory database and runs migrations.
    ///
    /// The pool is capped at one connection: every new in-memory SQLite
    /// connection would otherwise be a separate empty database.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let ledger = Self { pool };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: SqliteRow) -> Result<Product> {
        Ok(Product {
            product_id: ProductId::new(row.try_get("product_id")?),
            title: row.try_get("title")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            category: row.try_get("category")?,
            qty_available: row.try_get("qty_available")?,
            active: row.try_get("active")?,
        })
    }
}

// order_id is persisted as 0 for holds not tied to an order.
fn order_key(order_id: Option<OrderId>) -> i64 {
    order_id.map_or(0, |id| id.as_i64())
}

#[async_trait]
impl StockLedger for SqliteStockLedger {
    async fn get_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, title, price_cents, category, qty_available, active
            FROM products
            ORDER BY product_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn upsert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (product_id, title, price_cents, category, qty_available, active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (product_id) DO UPDATE SET
                title = excluded.title,
                price_cents = excluded.price_cents,
                category = excluded.category,
                qty_available = excluded.qty_available,
                active = excluded.active
            "#,
        )
        .bind(product.product_id.as_i64())
        .bind(&product.title)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(product.qty_available)
        .bind(product.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_product_qty(&self, product_id: ProductId, new_qty: i64) -> Result<()> {
        let result = sqlx::query("UPDATE products SET qty_available = ?1 WHERE product_id = ?2")
            .bind(new_qty)
            .bind(product_id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::ProductNotFound(product_id));
        }
        Ok(())
    }

    async fn insert_reservations(&self, rows: Vec<ReservationRow>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO reservations
                    (order_id, product_id, qty, reserve_timestamp, expiry_timestamp, released)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(order_key(row.order_id))
            .bind(row.product_id.as_i64())
            .bind(row.qty)
            .bind(row.reserve_timestamp)
            .bind(row.expiry_timestamp)
            .bind(row.released)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn release_reservations(
        &self,
        order_id: Option<OrderId>,
        product_ids: &[ProductId],
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;

        for product_id in product_ids {
            let result = sqlx::query(
                r#"
                UPDATE reservations
                SET released = 1
                WHERE order_id = ?1 AND product_id = ?2 AND released = 0
                "#,
            )
            .bind(order_key(order_id))
            .bind(product_id.as_i64())
            .execute(&mut *tx)
            .await?;

            affected += result.rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }

    async fn live_reserved_totals(
        &self,
        now: DateTime<Utc>,
    ) -> Result<HashMap<ProductId, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, SUM(qty) AS total
            FROM reservations
            WHERE released = 0 AND expiry_timestamp > ?1
            GROUP BY product_id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut totals = HashMap::new();
        for row in rows {
            let product_id = ProductId::new(row.try_get("product_id")?);
            let total: i64 = row.try_get("total")?;
            totals.insert(product_id, total);
        }
        Ok(totals)
    }
}
