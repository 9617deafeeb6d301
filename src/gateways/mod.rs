use crate::domain::payment::PaymentRequest;

pub mod mock;
pub mod simulated;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Success,
    TransientFailure(String),
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Downstream processor invoked once a request is admitted and not a duplicate.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, request: &PaymentRequest) -> ProcessingOutcome;
}
