use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.idempotency_store.as_ref();
    let limiter = &state.payment_service.limiter;
    let store_ok = tokio::time::timeout(
        state.payment_service.settings.store_timeout,
        store.ping(),
    )
    .await
    .map(|res| res.is_ok())
    .unwrap_or(false);

    let status = if store_ok {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": store_ok,
            "store": store.name(),
            "store_ok": store_ok,
            "tokens_available": limiter.available(),
            "capacity": limiter.capacity(),
            "refill_period_ms": limiter.refill_period().as_millis() as u64,
        })),
    )
        .into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (axum::http::StatusCode::OK, Json(serde_json::json!({"alive": true}))).into_response()
}
