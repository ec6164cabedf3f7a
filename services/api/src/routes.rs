use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Extension;
use axum::Json;
use bed_switch::workflows::switching::{
    switch_router, AccommodationRepository, ResourceRepository, SwitchNotifier,
    SwitchRequestRepository, SwitchRequestService,
};
use serde_json::json;
use std::sync::Arc;

/// Switch request API plus the operational endpoints. Expects `AppState` as an extension layer.
pub(crate) fn with_switch_routes<S, D, A, N>(
    service: Arc<SwitchRequestService<S, D, A, N>>,
) -> axum::Router
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    switch_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
