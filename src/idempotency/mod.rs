use crate::error::StoreError;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub mod memory;
pub mod store_redis;

/// Stored as the record value: `processing:<owner>` or `processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Reserved by a request that has not finished processing yet.
    InFlight,
    Processed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InFlight => "processing",
            Self::Processed => "processed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once(':').map_or(s, |(status, _)| status) {
            "processing" => Some(Self::InFlight),
            "processed" => Some(Self::Processed),
            _ => None,
        }
    }
}

/// Value written by a reservation, tagged with the owning request's token so
/// only that request can release it.
pub fn in_flight_value(owner: &str) -> String {
    format!("{}:{}", RecordStatus::InFlight.as_str(), owner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    pub key: String,
    pub status: RecordStatus,
    /// Token of the request holding an in-flight reservation.
    pub owner: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl IdempotencyRecord {
    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.recorded_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Result of an atomic insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The caller now owns the key and must either confirm or release it.
    Reserved,
    AlreadyProcessed,
    /// Another request holds the reservation.
    InFlight,
}

/// Key-value ledger of processed idempotency keys.
///
/// Implementations are responsible for their own synchronization; callers
/// never hold a lock across these calls.
#[async_trait::async_trait]
pub trait IdempotencyStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// True when any live record exists for `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Marks `key` processed for `ttl`. Overwrites a reservation; calling it
    /// twice is harmless.
    async fn record_processed(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically creates an in-flight record for `key`, owned by `owner`,
    /// unless one exists.
    async fn reserve(&self, key: &str, owner: &str, ttl: Duration)
        -> Result<Reservation, StoreError>;

    /// Drops the reservation for `key` if `owner` still holds it. Records
    /// owned by another request, and processed records, are left alone.
    async fn release(&self, key: &str, owner: &str) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
