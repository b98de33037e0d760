//! HTTP API server exposing the stock reservation engine.
//!
//! Provides REST endpoints for stock validation, reservation lifecycle
//! and final deduction, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use stock_ledger::StockLedger;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use routes::stock::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L: StockLedger + 'static>(
    state: Arc<AppState<L>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", get(routes::stock::products::<L>))
        .route("/stock/validate", post(routes::stock::validate::<L>))
        .route("/reservations", post(routes::stock::reserve::<L>))
        .route("/reservations/release", post(routes::stock::release::<L>))
        .route(
            "/reservations/snapshot",
            get(routes::stock::snapshot::<L>),
        )
        .route("/deductions", post(routes::stock::deduct::<L>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
