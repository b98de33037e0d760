//! Shared types for the shop stock system.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{OrderId, OrderItem, ProductId};
