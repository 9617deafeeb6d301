//! Fixed-window token bucket.
//!
//! The bucket is reset to full capacity on every refill tick, regardless of how
//! many tokens were consumed in the previous window. There is no trickle refill
//! and no queueing: callers either get a token immediately or are rejected.

use std::sync::{Arc, Mutex};
use crate::task::PeriodicTask;
use std::time::Duration;

#[derive(Debug)]
struct Bucket {
    capacity: u32,
    available: u32,
}

#[derive(Debug, Clone)]
pub struct FixedWindowLimiter {
    bucket: Arc<Mutex<Bucket>>,
    refill_period: Duration,
}

impl FixedWindowLimiter {
    pub fn new(capacity: u32, refill_period: Duration) -> Self {
        Self {
            bucket: Arc::new(Mutex::new(Bucket {
                capacity,
                available: capacity,
            })),
            refill_period,
        }
    }

    /// Takes one token if any are left. Never blocks beyond the bucket lock.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.lock();
        if bucket.available == 0 {
            return false;
        }
        bucket.available -= 1;
        true
    }

    /// Unconditionally resets the bucket to capacity.
    pub fn refill(&self) {
        let mut bucket = self.lock();
        bucket.available = bucket.capacity;
    }

    pub fn available(&self) -> u32 {
        self.lock().available
    }

    pub fn capacity(&self) -> u32 {
        self.lock().capacity
    }

    pub fn refill_period(&self) -> Duration {
        self.refill_period
    }

    /// Spawns the background task that refills the bucket once per period.
    /// The task runs until the returned handle is shut down or dropped.
    pub fn spawn_refill(&self) -> PeriodicTask {
        let limiter = self.clone();
        PeriodicTask::spawn("rate_limiter_refill", self.refill_period, move || limiter.refill())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Bucket> {
        // The critical section is a plain integer update, so a poisoned lock
        // still holds a valid count.
        self.bucket.lock().unwrap_or_else(|e| e.into_inner())
    }
}
