use crate::gateways::simulated::DEFAULT_FAILURE_RATE;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// How the service guards a key before calling the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdempotencyMode {
    /// Atomic insert-if-absent before processing, released on failure.
    Reserve,
    /// `EXISTS` before processing and `SET` after success. Two concurrent
    /// requests for one key can both reach the processor.
    CheckThenRecord,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: String,
    pub store_backend: StoreBackend,
    pub idempotency_mode: IdempotencyMode,
    pub idempotency_ttl: Duration,
    pub in_flight_ttl: Duration,
    /// How often the memory backend drops expired records.
    pub purge_interval: Duration,
    pub rate_limit_capacity: u32,
    pub rate_limit_refill: Duration,
    pub failure_rate: f64,
    pub store_timeout: Duration,
    pub processor_timeout: Duration,
    pub request_deadline: Duration,
    pub retry_max_attempts: u32,
    pub retry_base_delay: Duration,
    pub pay_endpoint: String,
    pub load_clients: usize,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8123".to_string()),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string()),
            store_backend: match std::env::var("IDEMPOTENCY_BACKEND").as_deref() {
                Ok("memory") => StoreBackend::Memory,
                _ => StoreBackend::Redis,
            },
            idempotency_mode: match std::env::var("IDEMPOTENCY_MODE").as_deref() {
                Ok("check-then-record") => IdempotencyMode::CheckThenRecord,
                _ => IdempotencyMode::Reserve,
            },
            idempotency_ttl: Duration::from_secs(env_or("IDEMPOTENCY_TTL_SECS", 24 * 60 * 60)),
            in_flight_ttl: Duration::from_secs(env_or("IN_FLIGHT_TTL_SECS", 30)),
            purge_interval: Duration::from_secs(env_or("PURGE_INTERVAL_SECS", 60).max(1)),
            rate_limit_capacity: env_or("RATE_LIMIT_CAPACITY", 10),
            rate_limit_refill: Duration::from_millis(env_or("RATE_LIMIT_REFILL_MS", 1000)),
            failure_rate: failure_rate(std::env::var("FAILURE_RATE").ok().as_deref()),
            store_timeout: Duration::from_millis(env_or("STORE_TIMEOUT_MS", 250)),
            processor_timeout: Duration::from_millis(env_or("PROCESSOR_TIMEOUT_MS", 2000)),
            request_deadline: Duration::from_millis(env_or("REQUEST_DEADLINE_MS", 5000)),
            retry_max_attempts: env_or("RETRY_MAX_ATTEMPTS", 5),
            retry_base_delay: Duration::from_millis(env_or("RETRY_BASE_DELAY_MS", 500)),
            pay_endpoint: std::env::var("PAY_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8123/pay".to_string()),
            load_clients: env_or("LOAD_CLIENTS", 5),
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

/// Parses `FAILURE_RATE`, falling back to the default for anything that is
/// not a finite number and clamping the rest into `[0, 1]`.
pub fn failure_rate(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|rate| rate.is_finite())
        .unwrap_or(DEFAULT_FAILURE_RATE)
        .clamp(0.0, 1.0)
}
