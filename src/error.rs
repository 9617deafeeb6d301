use crate::client::retrying_client::RetryAttempt;
use crate::domain::payment::{ErrorEnvelope, ErrorPayload};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Rejections produced by the payment front door.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("too many requests, please retry later")]
    RateLimited,
    #[error("payment with this idempotency key is already in flight")]
    PaymentInFlight,
    #[error("payment processing failed: {0}")]
    ProcessingError(String),
}

impl PaymentError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::PaymentInFlight => StatusCode::CONFLICT,
            Self::ProcessingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::RateLimited => "RATE_LIMITED",
            Self::PaymentInFlight => "PAYMENT_IN_FLIGHT",
            Self::ProcessingError(_) => "PROCESSING_ERROR",
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorPayload {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Failures talking to the idempotency backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("idempotency store unavailable: {0}")]
    Unavailable(String),
    #[error("idempotency store call timed out")]
    Timeout,
}

/// Terminal results of the retrying client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("gave up after {} attempts", .attempts.len())]
    Exhausted { attempts: Vec<RetryAttempt> },
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        Self::Unavailable(e.to_string())
    }
}
