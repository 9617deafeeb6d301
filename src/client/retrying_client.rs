//! Caller-side submission with exponential backoff.
//!
//! Every non-200 response is retried the same way, whether it came from the
//! rate limiter or from a processing failure. Idempotency on the server side is
//! what makes resubmitting the same key safe.

use crate::client::transport::{HttpTransport, PaymentTransport};
use crate::config::AppConfig;
use crate::domain::payment::PaymentRequest;
use crate::error::ClientError;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            max_attempts: cfg.retry_max_attempts,
            base_delay: cfg.retry_base_delay,
        }
    }

    /// No delay before the first attempt, then `base_delay` doubling each
    /// time: 0, 500ms, 1s, 2s, 4s for the defaults. No jitter and no cap.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    pub sequence_number: u32,
    pub delay_before_attempt: Duration,
    pub outcome: AttemptOutcome,
}

/// Attempt history of a submission that eventually succeeded.
#[derive(Debug, Clone)]
pub struct Submission {
    pub attempts: Vec<RetryAttempt>,
}

impl Submission {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

#[derive(Clone)]
pub struct RetryingClient {
    pub transport: Arc<dyn PaymentTransport>,
    pub policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(transport: Arc<dyn PaymentTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn http(endpoint: impl Into<String>, policy: RetryPolicy) -> Self {
        Self::new(Arc::new(HttpTransport::new(endpoint)), policy)
    }

    pub async fn submit(&self, request: &PaymentRequest) -> Result<Submission, ClientError> {
        let key = request.idempotency_key.as_str();
        let mut attempts = Vec::with_capacity(self.policy.max_attempts as usize);

        for i in 0..self.policy.max_attempts {
            let delay = self.policy.delay_before(i);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let outcome = match self.transport.send(request).await {
                Ok(status) if status == StatusCode::OK => AttemptOutcome::Success,
                Ok(status) => {
                    tracing::warn!(idempotency_key = %key, attempt = i + 1, status = %status, "payment attempt failed");
                    AttemptOutcome::Failure(format!("status {}", status))
                }
                Err(e) => {
                    tracing::warn!(idempotency_key = %key, attempt = i + 1, error = %e, "payment attempt errored");
                    AttemptOutcome::Failure(e.to_string())
                }
            };

            let succeeded = outcome == AttemptOutcome::Success;
            attempts.push(RetryAttempt {
                sequence_number: i,
                delay_before_attempt: delay,
                outcome,
            });

            if succeeded {
                tracing::info!(idempotency_key = %key, attempts = i + 1, "payment submitted");
                return Ok(Submission { attempts });
            }
        }

        tracing::error!(idempotency_key = %key, attempts = attempts.len(), "all payment attempts failed");
        Err(ClientError::Exhausted { attempts })
    }
}
