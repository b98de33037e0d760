use common::ProductId;
use stock_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur during reservation operations.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// The product does not exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Requested quantity exceeds what is available after live holds.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// A deduction would drive the authoritative quantity below zero.
    #[error(
        "Negative stock for product {product_id}: {qty_available} available, {requested} requested"
    )]
    NegativeStock {
        product_id: ProductId,
        qty_available: i64,
        requested: i64,
    },

    /// An error occurred in the stock ledger.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result type for reservation operations.
pub type Result<T> = std::result::Result<T, ReservationError>;
