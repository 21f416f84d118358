//! Route table for the service.

use crate::error::AppError;
use crate::handlers::{fraud_check, health_check, metrics, payment_confirmation, vendor_confirmation};
use crate::middleware::request_id_layer;
use crate::state::AppState;
use axum::Router;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Builds the router with every webhook, health and metrics route.
///
/// `/metrics` is only mounted when the state carries a Prometheus handle.
pub fn build_router(state: AppState) -> Router {
    let webhooks = Router::new()
        .route("/payment_confirmation", post(payment_confirmation))
        .route("/fraud_check", post(fraud_check))
        .route("/vendor_confirmation", post(vendor_confirmation));

    let mut router = Router::new()
        .nest("/order_status/webhook", webhooks)
        .route("/health", get(health_check));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(metrics));
    }

    router
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(request_id_layer())
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(uri.path())
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(ToString::to_string))
        .unwrap_or_else(|| "unknown panic".to_string());

    AppError::internal("An internal error occurred")
        .with_source(anyhow::anyhow!(detail))
        .into_response()
}
