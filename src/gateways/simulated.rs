use crate::domain::payment::PaymentRequest;
use crate::gateways::{PaymentGateway, ProcessingOutcome};
use rand::Rng;

pub const DEFAULT_FAILURE_RATE: f64 = 0.3;

/// Stand-in for a real processor: fails each attempt independently with
/// probability `failure_rate`.
#[derive(Debug, Clone)]
pub struct OutcomeSimulator {
    pub failure_rate: f64,
}

impl OutcomeSimulator {
    /// Clamps `failure_rate` into `[0, 1]`; NaN and infinities fall back to
    /// [`DEFAULT_FAILURE_RATE`].
    pub fn new(failure_rate: f64) -> Self {
        let failure_rate = if failure_rate.is_finite() {
            failure_rate.clamp(0.0, 1.0)
        } else {
            DEFAULT_FAILURE_RATE
        };
        Self { failure_rate }
    }

    pub fn roll(&self) -> ProcessingOutcome {
        if rand::thread_rng().gen_bool(self.failure_rate) {
            ProcessingOutcome::TransientFailure("simulated internal error".to_string())
        } else {
            ProcessingOutcome::Success
        }
    }
}

impl Default for OutcomeSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_RATE)
    }
}

#[async_trait::async_trait]
impl PaymentGateway for OutcomeSimulator {
    fn name(&self) -> &'static str {
        "simulator"
    }

    async fn attempt(&self, _request: &PaymentRequest) -> ProcessingOutcome {
        self.roll()
    }
}
