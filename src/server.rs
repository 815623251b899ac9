//! The inbound webhook endpoint.
//!
//! One logical operation: `POST /v1/webhook/{name}` receives an Alertmanager
//! notification batch and routes it to the named receiver's handler. The
//! response contract is fire-and-forget: 202 Accepted means the delivery was
//! started, not that it succeeded. When metrics are enabled the router also
//! exposes `GET /metrics` in Prometheus exposition format.

use crate::core::NotificationBatch;
use crate::registry::Registry;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::debug;

/// Builds the application router over a finished registry.
pub fn router(registry: Arc<Registry>, prometheus: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .route("/v1/webhook/{name}", post(receive_webhook))
        .with_state(registry);

    if let Some(handle) = prometheus {
        router = router.route("/metrics", get(move || async move { handle.render() }));
    }

    router
}

/// Receives an Alertmanager webhook and forwards it to the pre-configured
/// destination for the named receiver.
async fn receive_webhook(
    State(registry): State<Arc<Registry>>,
    Path(name): Path<String>,
    Json(batch): Json<NotificationBatch>,
) -> Response {
    let Some(handler) = registry.lookup(&name) else {
        debug!(receiver = %name, "webhook for unknown receiver");
        return (
            StatusCode::NOT_FOUND,
            format!("Unknown receiver '{}'", name),
        )
            .into_response();
    };

    // Once accepted, the delivery runs to completion on its own task,
    // independent of this request's lifecycle. Retries and backoff suspend
    // only that task.
    tokio::spawn(async move { handler.handle(&batch).await });

    StatusCode::ACCEPTED.into_response()
}
