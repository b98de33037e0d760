//! Stock validation, reservation, release and deduction endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{OrderId, OrderItem, ProductId};
use reservation::ReservationEngine;
use serde::{Deserialize, Serialize};
use stock_ledger::StockLedger;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<L: StockLedger> {
    pub engine: ReservationEngine<L>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub product_id: i64,
    pub qty: i64,
}

#[derive(Deserialize)]
pub struct ItemRequest {
    pub product_id: i64,
    pub qty: i64,
}

#[derive(Deserialize)]
pub struct ItemsRequest {
    pub order_id: Option<i64>,
    pub items: Vec<ItemRequest>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ValidateResponse {
    pub available: bool,
}

#[derive(Serialize)]
pub struct OpResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub product_id: i64,
    pub title: String,
    pub price_cents: i64,
    pub category: String,
    pub qty_available: i64,
    pub active: bool,
}

fn parse_items(req: &ItemsRequest) -> Result<Vec<OrderItem>, ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::BadRequest("items must not be empty".to_string()));
    }
    req.items
        .iter()
        .map(|item| {
            if item.qty < 1 {
                return Err(ApiError::BadRequest(format!(
                    "qty must be positive for product {}",
                    item.product_id
                )));
            }
            Ok(OrderItem::new(item.product_id, item.qty))
        })
        .collect()
}

// -- Handlers --

/// GET /products — catalog with authoritative quantities.
#[tracing::instrument(skip(state))]
pub async fn products<L: StockLedger + 'static>(
    State(state): State<Arc<AppState<L>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state
        .engine
        .ledger()
        .get_products()
        .await
        .map_err(reservation::ReservationError::from)?;

    let response = products
        .into_iter()
        .map(|p| ProductResponse {
            product_id: p.product_id.as_i64(),
            title: p.title,
            price_cents: p.price.cents(),
            category: p.category,
            qty_available: p.qty_available,
            active: p.active,
        })
        .collect();
    Ok(Json(response))
}

/// POST /stock/validate — advisory availability check.
#[tracing::instrument(skip(state, req))]
pub async fn validate<L: StockLedger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let available = state
        .engine
        .validate_stock(ProductId::new(req.product_id), req.qty)
        .await?;
    Ok(Json(ValidateResponse { available }))
}

/// POST /reservations — place a TTL-bound hold for every item.
#[tracing::instrument(skip(state, req))]
pub async fn reserve<L: StockLedger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Json(req): Json<ItemsRequest>,
) -> Result<(StatusCode, Json<OpResponse>), ApiError> {
    let items = parse_items(&req)?;
    state
        .engine
        .reserve_items(&items, req.order_id.map(OrderId::new))
        .await?;
    Ok((StatusCode::CREATED, Json(OpResponse { status: "reserved" })))
}

/// POST /reservations/release — release the holds for every item.
#[tracing::instrument(skip(state, req))]
pub async fn release<L: StockLedger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Json(req): Json<ItemsRequest>,
) -> Result<Json<OpResponse>, ApiError> {
    let items = parse_items(&req)?;
    state
        .engine
        .release_reservation(&items, req.order_id.map(OrderId::new))
        .await?;
    Ok(Json(OpResponse { status: "released" }))
}

/// POST /deductions — permanently reduce authoritative stock.
#[tracing::instrument(skip(state, req))]
pub async fn deduct<L: StockLedger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Json(req): Json<ItemsRequest>,
) -> Result<Json<OpResponse>, ApiError> {
    let items = parse_items(&req)?;
    state.engine.final_deduction(&items).await?;
    Ok(Json(OpResponse { status: "deducted" }))
}

/// GET /reservations/snapshot — diagnostic copy of the reserved aggregate.
#[tracing::instrument(skip(state))]
pub async fn snapshot<L: StockLedger + 'static>(
    State(state): State<Arc<AppState<L>>>,
) -> Json<HashMap<ProductId, i64>> {
    Json(state.engine.qty_reserved_snapshot().await)
}
