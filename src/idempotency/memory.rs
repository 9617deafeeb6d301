use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::idempotency::{IdempotencyRecord, IdempotencyStore, RecordStatus, Reservation};
use crate::task::PeriodicTask;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Process-local store. Expired records are dropped lazily on access and in
/// bulk by [`InMemoryIdempotencyStore::purge_expired`], which
/// [`InMemoryIdempotencyStore::spawn_purge`] runs periodically.
#[derive(Clone)]
pub struct InMemoryIdempotencyStore {
    records: Arc<Mutex<HashMap<String, IdempotencyRecord>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<IdempotencyRecord> {
        let now = self.clock.now();
        let mut records = self.lock();
        live_record(&mut records, key, now).cloned()
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, r| !r.is_expired(now));
        before - records.len()
    }

    /// Spawns a loop that purges expired records once per `period`, so keys
    /// that are never seen again do not accumulate.
    pub fn spawn_purge(&self, period: Duration) -> PeriodicTask {
        let store = self.clone();
        PeriodicTask::spawn("idempotency_purge", period, move || {
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, remaining = store.len(), "purged expired idempotency records");
            }
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, IdempotencyRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(
        &self,
        key: &str,
        status: RecordStatus,
        owner: Option<&str>,
        ttl: Duration,
    ) -> IdempotencyRecord {
        IdempotencyRecord {
            key: key.to_string(),
            status,
            owner: owner.map(str::to_string),
            recorded_at: self.clock.now(),
            ttl,
        }
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

fn live_record<'a>(
    records: &'a mut HashMap<String, IdempotencyRecord>,
    key: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<&'a IdempotencyRecord> {
    if records.get(key).is_some_and(|r| r.is_expired(now)) {
        records.remove(key);
    }
    records.get(key)
}

#[async_trait::async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut records = self.lock();
        Ok(live_record(&mut records, key, now).is_some())
    }

    async fn record_processed(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let record = self.record(key, RecordStatus::Processed, None, ttl);
        self.lock().insert(key.to_string(), record);
        Ok(())
    }

    async fn reserve(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<Reservation, StoreError> {
        let now = self.clock.now();
        let fresh = self.record(key, RecordStatus::InFlight, Some(owner), ttl);
        let mut records = self.lock();
        let existing = live_record(&mut records, key, now).map(|r| r.status);
        match existing {
            Some(RecordStatus::Processed) => Ok(Reservation::AlreadyProcessed),
            Some(RecordStatus::InFlight) => Ok(Reservation::InFlight),
            None => {
                records.insert(key.to_string(), fresh);
                Ok(Reservation::Reserved)
            }
        }
    }

    async fn release(&self, key: &str, owner: &str) -> Result<(), StoreError> {
        let mut records = self.lock();
        let held = records.get(key).is_some_and(|r| {
            r.status == RecordStatus::InFlight && r.owner.as_deref() == Some(owner)
        });
        if held {
            records.remove(key);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
