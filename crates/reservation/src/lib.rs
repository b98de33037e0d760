//! Inventory reservation engine.
//!
//! Validates availability against the stock ledger minus in-flight holds,
//! creates and releases TTL-bound reservations, and performs the permanent
//! stock deduction under per-product mutual exclusion. The engine owns a
//! derived in-memory aggregate of live reservations, rebuilt from the
//! ledger at process start and kept incrementally in sync afterwards.

pub mod engine;
pub mod error;

pub use engine::{DEFAULT_RESERVATION_TTL_MINUTES, ReservationEngine};
pub use error::{ReservationError, Result};
