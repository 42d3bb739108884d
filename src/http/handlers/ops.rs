use crate::domain::payment::Backend;
use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let service = &state.payment_service;
    let default = service.health_snapshot(Backend::Default);
    let fallback = service.health_snapshot(Backend::Fallback);

    let ok = !service.is_shutting_down() && (default.is_healthy || fallback.is_healthy);
    let status = if ok {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": ok,
            "default": default,
            "fallback": fallback,
            "queue_depth": service.queue.len(),
            "queue_capacity": service.queue.capacity(),
            "pending": service.correlations.len(),
        })),
    )
        .into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (axum::http::StatusCode::OK, Json(serde_json::json!({"alive": true}))).into_response()
}
