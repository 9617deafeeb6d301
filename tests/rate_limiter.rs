use payments_frontdoor::limiter::fixed_window::FixedWindowLimiter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn admits_capacity_then_rejects() {
    let limiter = FixedWindowLimiter::new(10, Duration::from_secs(1));
    for _ in 0..10 {
        assert!(limiter.try_acquire());
    }
    assert!(!limiter.try_acquire());
    assert_eq!(limiter.available(), 0);
}

#[test]
fn rejection_does_not_mutate() {
    let limiter = FixedWindowLimiter::new(1, Duration::from_secs(1));
    assert!(limiter.try_acquire());
    for _ in 0..5 {
        assert!(!limiter.try_acquire());
    }
    assert_eq!(limiter.available(), 0);
}

#[test]
fn refill_resets_to_exact_capacity() {
    let limiter = FixedWindowLimiter::new(10, Duration::from_secs(1));
    for _ in 0..7 {
        limiter.try_acquire();
    }
    assert_eq!(limiter.available(), 3);
    limiter.refill();
    assert_eq!(limiter.available(), 10);

    limiter.refill();
    assert_eq!(limiter.available(), 10);
}

#[tokio::test(start_paused = true)]
async fn background_task_refills_every_period() {
    let limiter = FixedWindowLimiter::new(10, Duration::from_secs(1));
    let refill = limiter.spawn_refill();

    while limiter.try_acquire() {}
    assert_eq!(limiter.available(), 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(limiter.available(), 0);

    tokio::time::sleep(Duration::from_millis(501)).await;
    assert_eq!(limiter.available(), 10);

    limiter.try_acquire();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(limiter.available(), 10);

    refill.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_refilling() {
    let limiter = FixedWindowLimiter::new(3, Duration::from_secs(1));
    let refill = limiter.spawn_refill();
    refill.shutdown().await;

    while limiter.try_acquire() {}
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(limiter.available(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_never_exceed_capacity() {
    let limiter = FixedWindowLimiter::new(10, Duration::from_secs(60));
    let admitted = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let limiter = limiter.clone();
        let admitted = admitted.clone();
        handles.push(tokio::spawn(async move {
            if limiter.try_acquire() {
                admitted.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 10);
    assert_eq!(limiter.available(), 0);
}
