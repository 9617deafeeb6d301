use crate::config::{AppConfig, IdempotencyMode};
use crate::domain::payment::{PaymentOutcome, PaymentRequest};
use crate::error::{PaymentError, StoreError};
use crate::gateways::{PaymentGateway, ProcessingOutcome};
use crate::idempotency::{IdempotencyStore, Reservation};
use crate::limiter::fixed_window::FixedWindowLimiter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub mode: IdempotencyMode,
    pub idempotency_ttl: Duration,
    pub in_flight_ttl: Duration,
    pub store_timeout: Duration,
    pub processor_timeout: Duration,
    /// Budget for one inbound request, shared by the store lookup and the
    /// processor call.
    pub request_deadline: Duration,
}

impl ServiceSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let settings = Self {
            mode: cfg.idempotency_mode,
            idempotency_ttl: cfg.idempotency_ttl,
            in_flight_ttl: cfg.in_flight_ttl,
            store_timeout: cfg.store_timeout,
            processor_timeout: cfg.processor_timeout,
            request_deadline: cfg.request_deadline,
        };
        let effective = settings.reservation_ttl();
        if effective > settings.in_flight_ttl {
            tracing::warn!(
                configured_ms = settings.in_flight_ttl.as_millis() as u64,
                effective_ms = effective.as_millis() as u64,
                "in-flight ttl shorter than reserve + processor + release, raising it"
            );
        }
        settings
    }

    /// Longest a request can hold a reservation: the reserve call, the
    /// processor call and the release call, each at their timeout.
    pub fn max_hold(&self) -> Duration {
        self.store_timeout
            .saturating_add(self.processor_timeout)
            .saturating_add(self.store_timeout)
    }

    /// TTL actually written for reservations. Never shorter than
    /// [`ServiceSettings::max_hold`] plus one second, so a reservation cannot
    /// expire while its owner is still processing.
    pub fn reservation_ttl(&self) -> Duration {
        self.in_flight_ttl
            .max(self.max_hold().saturating_add(Duration::from_secs(1)))
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            mode: IdempotencyMode::Reserve,
            idempotency_ttl: Duration::from_secs(24 * 60 * 60),
            in_flight_ttl: Duration::from_secs(30),
            store_timeout: Duration::from_millis(250),
            processor_timeout: Duration::from_secs(2),
            request_deadline: Duration::from_secs(5),
        }
    }
}

/// Admission, deduplication and processing for one `POST /pay`.
///
/// The limiter is consulted before the store so a rejected request never
/// touches the backend. Store failures fail open: the request is processed as
/// if the key were new. Every reservation is tagged with a per-request token
/// and released only by that token.
#[derive(Clone)]
pub struct PaymentService {
    pub limiter: FixedWindowLimiter,
    pub store: Arc<dyn IdempotencyStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub settings: ServiceSettings,
}

impl PaymentService {
    pub fn parse_request(body: &[u8]) -> Result<PaymentRequest, PaymentError> {
        let req: PaymentRequest =
            serde_json::from_slice(body).map_err(|e| PaymentError::BadRequest(e.to_string()))?;
        validate_request(&req)?;
        Ok(req)
    }

    pub async fn process(&self, req: PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
        validate_request(&req)?;
        let deadline = Instant::now() + self.settings.request_deadline;

        if !self.limiter.try_acquire() {
            tracing::warn!(idempotency_key = %req.idempotency_key, outcome = "rate_limited", "payment rejected by rate limiter");
            return Err(PaymentError::RateLimited);
        }

        match self.settings.mode {
            IdempotencyMode::Reserve => self.process_reserved(&req, deadline).await,
            IdempotencyMode::CheckThenRecord => self.process_checked(&req, deadline).await,
        }
    }

    async fn process_reserved(
        &self,
        req: &PaymentRequest,
        deadline: Instant,
    ) -> Result<PaymentOutcome, PaymentError> {
        let key = req.idempotency_key.as_str();
        let owner = Uuid::new_v4().to_string();
        let reservation = match self
            .store_call(
                self.budget(deadline, self.settings.store_timeout),
                self.store.reserve(key, &owner, self.settings.reservation_ttl()),
            )
            .await
        {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(idempotency_key = %key, error = %e, "reserve failed, processing without reservation");
                None
            }
        };

        match reservation {
            Some(Reservation::AlreadyProcessed) => {
                tracing::info!(idempotency_key = %key, outcome = "duplicate", "duplicate payment request");
                return Ok(PaymentOutcome::Duplicate);
            }
            Some(Reservation::InFlight) => {
                tracing::info!(idempotency_key = %key, outcome = "in_flight", "payment already in flight");
                return Err(PaymentError::PaymentInFlight);
            }
            Some(Reservation::Reserved) | None => {}
        }

        match self.call_gateway(req, deadline).await {
            ProcessingOutcome::Success => {
                self.confirm(key).await;
                tracing::info!(idempotency_key = %key, outcome = "processed", "payment processed");
                Ok(PaymentOutcome::Processed)
            }
            ProcessingOutcome::TransientFailure(reason) => {
                // Runs after a failed reserve too; the store may have
                // committed it before the call timed out.
                let released = self
                    .store_call(self.settings.store_timeout, self.store.release(key, &owner))
                    .await;
                if let Err(e) = released {
                    tracing::error!(idempotency_key = %key, error = %e, "failed to release reservation");
                }
                tracing::error!(idempotency_key = %key, outcome = "failed", reason = %reason, "payment processing failed");
                Err(PaymentError::ProcessingError(reason))
            }
        }
    }

    async fn process_checked(
        &self,
        req: &PaymentRequest,
        deadline: Instant,
    ) -> Result<PaymentOutcome, PaymentError> {
        let key = req.idempotency_key.as_str();
        let seen = self
            .store_call(
                self.budget(deadline, self.settings.store_timeout),
                self.store.exists(key),
            )
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(idempotency_key = %key, error = %e, "exists check failed, treating key as new");
                false
            });

        if seen {
            tracing::info!(idempotency_key = %key, outcome = "duplicate", "duplicate payment request");
            return Ok(PaymentOutcome::Duplicate);
        }

        match self.call_gateway(req, deadline).await {
            ProcessingOutcome::Success => {
                self.confirm(key).await;
                tracing::info!(idempotency_key = %key, outcome = "processed", "payment processed");
                Ok(PaymentOutcome::Processed)
            }
            ProcessingOutcome::TransientFailure(reason) => {
                tracing::error!(idempotency_key = %key, outcome = "failed", reason = %reason, "payment processing failed");
                Err(PaymentError::ProcessingError(reason))
            }
        }
    }

    async fn call_gateway(&self, req: &PaymentRequest, deadline: Instant) -> ProcessingOutcome {
        let budget = self.budget(deadline, self.settings.processor_timeout);
        match tokio::time::timeout(budget, self.gateway.attempt(req)).await {
            Ok(outcome) => outcome,
            Err(_) => ProcessingOutcome::TransientFailure(format!(
                "{} timed out after {}ms",
                self.gateway.name(),
                budget.as_millis()
            )),
        }
    }

    /// Writes the processed record. The payment has already happened, so a
    /// store failure here is logged and the caller still gets a success.
    async fn confirm(&self, key: &str) {
        let recorded = self
            .store_call(
                self.settings.store_timeout,
                self.store.record_processed(key, self.settings.idempotency_ttl),
            )
            .await;
        if let Err(e) = recorded {
            tracing::error!(idempotency_key = %key, error = %e, "failed to record processed payment");
        }
    }

    fn budget(&self, deadline: Instant, cap: Duration) -> Duration {
        cap.min(deadline.saturating_duration_since(Instant::now()))
    }

    async fn store_call<T, F>(&self, budget: Duration, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(budget, call).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

fn validate_request(req: &PaymentRequest) -> Result<(), PaymentError> {
    if req.idempotency_key.trim().is_empty() {
        return Err(PaymentError::BadRequest("idempotency_key is required".to_string()));
    }
    if req.user_id.trim().is_empty() {
        return Err(PaymentError::BadRequest("user_id is required".to_string()));
    }
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(PaymentError::BadRequest("amount must be a positive number".to_string()));
    }
    Ok(())
}
