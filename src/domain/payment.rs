use serde::{Deserialize, Serialize};

/// Body of `POST /pay`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PaymentRequest {
    pub user_id: String,
    pub amount: f64,
    pub idempotency_key: String,
}

impl PaymentRequest {
    pub fn new(user_id: impl Into<String>, amount: f64, idempotency_key: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            idempotency_key: idempotency_key.into(),
        }
    }
}

/// Fresh successes and duplicates share this body so a replay is
/// indistinguishable from the first submission.
pub const PAYMENT_ACCEPTED_MESSAGE: &str = "Payment already processed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentResponse {
    pub message: String,
}

impl PaymentResponse {
    pub fn accepted() -> Self {
        Self {
            message: PAYMENT_ACCEPTED_MESSAGE.to_string(),
        }
    }
}

/// Internal outcome of one request, used for logging and tests; never
/// serialized to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Processed,
    Duplicate,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}
