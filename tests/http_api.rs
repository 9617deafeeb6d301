use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use payments_frontdoor::client::retrying_client::{RetryPolicy, RetryingClient};
use payments_frontdoor::domain::payment::{PaymentRequest, PaymentResponse, PAYMENT_ACCEPTED_MESSAGE};
use payments_frontdoor::gateways::mock::{MockBehavior, MockGateway};
use payments_frontdoor::idempotency::memory::InMemoryIdempotencyStore;
use payments_frontdoor::limiter::fixed_window::FixedWindowLimiter;
use payments_frontdoor::metrics::counters::PaymentMetrics;
use payments_frontdoor::service::payment_service::{PaymentService, ServiceSettings};
use payments_frontdoor::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app(capacity: u32, gateway: MockGateway) -> (Router, PaymentMetrics) {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let metrics = PaymentMetrics::new().unwrap();
    let state = AppState {
        payment_service: PaymentService {
            limiter: FixedWindowLimiter::new(capacity, Duration::from_secs(1)),
            store: store.clone(),
            gateway: Arc::new(gateway),
            settings: ServiceSettings::default(),
        },
        idempotency_store: store,
        metrics: metrics.clone(),
    };
    (build_router(state), metrics)
}

fn pay(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/pay")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

const VALID: &str = r#"{"user_id":"user1","amount":100.0,"idempotency_key":"abc123"}"#;

#[tokio::test]
async fn fresh_and_duplicate_responses_match() {
    let gateway = MockGateway::new(MockBehavior::AlwaysSuccess);
    let (app, _) = app(10, gateway.clone());

    let first = app.clone().oneshot(pay(VALID)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = body_string(first).await;

    let second = app.clone().oneshot(pay(VALID)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second_body = body_string(second).await;

    assert_eq!(first_body, second_body);
    let parsed: PaymentResponse = serde_json::from_str(&first_body).unwrap();
    assert_eq!(parsed.message, PAYMENT_ACCEPTED_MESSAGE);
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn status_codes_for_each_rejection() {
    let (app, metrics) = app(1, MockGateway::new(MockBehavior::AlwaysFailure));

    let malformed = app.clone().oneshot(pay("{not json")).await.unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let wrong_method = app
        .clone()
        .oneshot(Request::builder().method(Method::GET).uri("/pay").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);

    let failed = app.clone().oneshot(pay(VALID)).await.unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(failed).await.contains("PROCESSING_ERROR"));

    let limited = app.clone().oneshot(pay(VALID)).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(metrics.requests_total(), 4);
    assert_eq!(metrics.requests_failed(), 4);
}

#[tokio::test]
async fn metrics_endpoint_exposes_counters() {
    let (app, _) = app(10, MockGateway::new(MockBehavior::AlwaysSuccess));
    app.clone().oneshot(pay(VALID)).await.unwrap();
    app.clone().oneshot(pay("[]")).await.unwrap();

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_string(resp).await;
    assert!(text.contains("payment_requests_total 2"), "{}", text);
    assert!(text.contains("payment_requests_failed 1"), "{}", text);
}

#[tokio::test]
async fn ops_endpoints_report_ready() {
    let (app, _) = app(10, MockGateway::new(MockBehavior::AlwaysSuccess));

    let live = app
        .clone()
        .oneshot(Request::builder().uri("/ops/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(live.status(), StatusCode::OK);

    let ready = app
        .clone()
        .oneshot(Request::builder().uri("/ops/readiness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(ready).await).unwrap();
    assert_eq!(body["store"], "memory");
    assert_eq!(body["tokens_available"], 10);
    assert_eq!(body["capacity"], 10);
    assert_eq!(body["refill_period_ms"], 1000);
}

#[tokio::test]
async fn retrying_client_recovers_over_http() {
    let gateway = MockGateway::new(MockBehavior::FailFirst(2));
    let (app, _) = app(10, gateway.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let client = RetryingClient::http(
        format!("http://{}/pay", addr),
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
        },
    );
    let request = PaymentRequest::new("user1", 100.0, "key-http");

    let submission = client.submit(&request).await.unwrap();
    assert_eq!(submission.attempt_count(), 3);

    let replay = client.submit(&request).await.unwrap();
    assert_eq!(replay.attempt_count(), 1);
    assert_eq!(gateway.calls(), 3);

    server.abort();
}
