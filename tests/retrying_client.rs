use payments_frontdoor::client::retrying_client::{AttemptOutcome, RetryPolicy, RetryingClient};
use payments_frontdoor::client::transport::PaymentTransport;
use payments_frontdoor::domain::payment::PaymentRequest;
use payments_frontdoor::error::ClientError;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Replays scripted responses and records when each call arrived.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<StatusCode, ClientError>>>,
    fallback: StatusCode,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<StatusCode, ClientError>>, fallback: StatusCode) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PaymentTransport for ScriptedTransport {
    async fn send(&self, _request: &PaymentRequest) -> Result<StatusCode, ClientError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.fallback))
    }
}

fn request() -> PaymentRequest {
    PaymentRequest::new("user0", 100.0, "key-0")
}

fn gaps(times: &[Instant]) -> Vec<Duration> {
    times.windows(2).map(|w| w[1] - w[0]).collect()
}

fn close_to(actual: Duration, expected: Duration) -> bool {
    actual >= expected && actual < expected + Duration::from_millis(20)
}

#[test]
fn default_backoff_schedule() {
    let policy = RetryPolicy::default();
    let delays: Vec<Duration> = (0..5).map(|i| policy.delay_before(i)).collect();
    assert_eq!(
        delays,
        vec![
            Duration::ZERO,
            Duration::from_millis(500),
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
        ]
    );
}

#[test]
fn backoff_is_uncapped_and_saturates() {
    let policy = RetryPolicy {
        max_attempts: 100,
        base_delay: Duration::from_millis(500),
    };
    assert_eq!(policy.delay_before(11), Duration::from_millis(500 * 1024));
    assert!(policy.delay_before(80) > Duration::from_secs(60 * 60 * 24));
}

#[tokio::test(start_paused = true)]
async fn always_failing_endpoint_exhausts_after_five_attempts() {
    let transport = ScriptedTransport::new(vec![], StatusCode::INTERNAL_SERVER_ERROR);
    let client = RetryingClient::new(transport.clone(), RetryPolicy::default());

    let err = client.submit(&request()).await.unwrap_err();
    let ClientError::Exhausted { attempts } = err else {
        panic!("expected exhaustion");
    };

    assert_eq!(attempts.len(), 5);
    assert!(attempts
        .iter()
        .all(|a| matches!(a.outcome, AttemptOutcome::Failure(_))));
    let recorded: Vec<Duration> = attempts.iter().map(|a| a.delay_before_attempt).collect();
    assert_eq!(recorded, (0..5).map(|i| RetryPolicy::default().delay_before(i)).collect::<Vec<_>>());
    let sequence: Vec<u32> = attempts.iter().map(|a| a.sequence_number).collect();
    assert_eq!(sequence, vec![0, 1, 2, 3, 4]);

    let observed = gaps(&transport.call_times());
    let expected = [500, 1000, 2000, 4000].map(Duration::from_millis);
    assert_eq!(observed.len(), expected.len());
    for (actual, want) in observed.iter().zip(expected) {
        assert!(close_to(*actual, want), "gap {:?} expected {:?}", actual, want);
    }
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_fourth_attempt() {
    let transport = ScriptedTransport::new(
        vec![
            Ok(StatusCode::INTERNAL_SERVER_ERROR),
            Ok(StatusCode::INTERNAL_SERVER_ERROR),
            Ok(StatusCode::INTERNAL_SERVER_ERROR),
        ],
        StatusCode::OK,
    );
    let client = RetryingClient::new(transport.clone(), RetryPolicy::default());

    let submission = client.submit(&request()).await.unwrap();

    assert_eq!(submission.attempt_count(), 4);
    assert_eq!(submission.attempts[3].outcome, AttemptOutcome::Success);
    assert_eq!(transport.call_times().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn rate_limits_and_transport_errors_are_retried_alike() {
    let transport = ScriptedTransport::new(
        vec![
            Ok(StatusCode::TOO_MANY_REQUESTS),
            Err(ClientError::Transport("connection reset".to_string())),
            Ok(StatusCode::CONFLICT),
        ],
        StatusCode::OK,
    );
    let client = RetryingClient::new(transport.clone(), RetryPolicy::default());

    let started = Instant::now();
    let submission = client.submit(&request()).await.unwrap();

    assert_eq!(submission.attempt_count(), 4);
    assert!(close_to(started.elapsed(), Duration::from_millis(3500)));
}

#[tokio::test(start_paused = true)]
async fn first_success_stops_immediately() {
    let transport = ScriptedTransport::new(vec![], StatusCode::OK);
    let client = RetryingClient::new(transport.clone(), RetryPolicy::default());

    let started = Instant::now();
    let submission = client.submit(&request()).await.unwrap();

    assert_eq!(submission.attempt_count(), 1);
    assert_eq!(submission.attempts[0].delay_before_attempt, Duration::ZERO);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn backoff_does_not_block_other_clients() {
    let slow = ScriptedTransport::new(vec![], StatusCode::INTERNAL_SERVER_ERROR);
    let fast = ScriptedTransport::new(vec![], StatusCode::OK);
    let slow_client = RetryingClient::new(slow, RetryPolicy::default());
    let fast_client = RetryingClient::new(fast, RetryPolicy::default());

    let backing_off = tokio::spawn(async move { slow_client.submit(&request()).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    fast_client.submit(&request()).await.unwrap();
    assert_eq!(started.elapsed(), Duration::ZERO);

    assert!(backing_off.await.unwrap().is_err());
}
