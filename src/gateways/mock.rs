use crate::domain::payment::PaymentRequest;
use crate::gateways::{PaymentGateway, ProcessingOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum MockBehavior {
    AlwaysSuccess,
    AlwaysFailure,
    /// Fails the first `n` calls, then succeeds.
    FailFirst(usize),
    /// Sleeps before succeeding.
    Slow(Duration),
}

/// Deterministic gateway that counts how often it was called.
#[derive(Debug, Clone)]
pub struct MockGateway {
    pub behavior: MockBehavior,
    calls: Arc<AtomicUsize>,
}

impl MockGateway {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn attempt(&self, _request: &PaymentRequest) -> ProcessingOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::AlwaysSuccess => ProcessingOutcome::Success,
            MockBehavior::AlwaysFailure => {
                ProcessingOutcome::TransientFailure("mock decline".to_string())
            }
            MockBehavior::FailFirst(n) if call < *n => {
                ProcessingOutcome::TransientFailure(format!("mock failure {}", call + 1))
            }
            MockBehavior::FailFirst(_) => ProcessingOutcome::Success,
            MockBehavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                ProcessingOutcome::Success
            }
        }
    }
}
