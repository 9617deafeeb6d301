use crate::domain::payment::PaymentResponse;
use crate::error::PaymentError;
use crate::service::payment_service::PaymentService;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::Instrument;
use uuid::Uuid;

pub async fn pay(State(state): State<AppState>, body: Bytes) -> Response {
    state.metrics.record_received();
    let request_id = Uuid::new_v4();

    let result = async {
        let req = PaymentService::parse_request(&body)?;
        state.payment_service.process(req).await
    }
    .instrument(tracing::info_span!("pay", %request_id))
    .await;

    match result {
        Ok(_) => (axum::http::StatusCode::OK, Json(PaymentResponse::accepted())).into_response(),
        Err(e) => {
            state.metrics.record_failed();
            if let PaymentError::BadRequest(reason) = &e {
                tracing::warn!(%request_id, reason = %reason, "invalid payment request");
            }
            e.into_response()
        }
    }
}

pub async fn method_not_allowed(State(state): State<AppState>) -> Response {
    state.metrics.record_received();
    state.metrics.record_failed();
    PaymentError::MethodNotAllowed.into_response()
}
