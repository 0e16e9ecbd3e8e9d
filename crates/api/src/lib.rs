//! HTTP API server for the marketplace order engine.
//!
//! Exposes order placement, the order lifecycle and the notification inbox
//! as REST endpoints, with structured logging (tracing) and Prometheus
//! metrics. The caller is identified by the `x-user-id` header.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use orders::NotificationEmitter;
use store::MarketStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, N>(state: Arc<AppState<S, N>>, metrics_handle: PrometheusHandle) -> Router
where
    S: MarketStore + 'static,
    N: NotificationEmitter + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/orders", post(routes::orders::place::<S, N>))
        .route("/api/orders/mine", get(routes::orders::mine::<S, N>))
        .route(
            "/api/orders/shop/{shop_id}",
            get(routes::orders::by_shop::<S, N>),
        )
        .route("/api/orders/{id}", get(routes::orders::get::<S, N>))
        .route(
            "/api/orders/{id}/status",
            put(routes::orders::update_status::<S, N>),
        )
        .route(
            "/api/orders/{id}/cancel",
            put(routes::orders::cancel::<S, N>),
        )
        .route(
            "/api/notifications",
            get(routes::notifications::list::<S, N>),
        )
        .route(
            "/api/notifications/{id}/read",
            put(routes::notifications::mark_read::<S, N>),
        )
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
