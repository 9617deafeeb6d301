pub mod client {
    pub mod retrying_client;
    pub mod transport;
}
pub mod clock;
pub mod config;
pub mod domain {
    pub mod payment;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod metrics;
        pub mod ops;
        pub mod payments;
    }
}
pub mod idempotency;
pub mod limiter {
    pub mod fixed_window;
}
pub mod metrics {
    pub mod counters;
}
pub mod service {
    pub mod payment_service;
}
pub mod task;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
    pub idempotency_store: Arc<dyn idempotency::IdempotencyStore>,
    pub metrics: metrics::counters::PaymentMetrics,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/pay",
            post(http::handlers::payments::pay).fallback(http::handlers::payments::method_not_allowed),
        )
        .route("/metrics", get(http::handlers::metrics::scrape))
        .route("/ops/liveness", get(http::handlers::ops::liveness))
        .route("/ops/readiness", get(http::handlers::ops::readiness))
        .with_state(state)
}
