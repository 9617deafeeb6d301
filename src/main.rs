use payments_frontdoor::config::{AppConfig, StoreBackend};
use payments_frontdoor::gateways::simulated::OutcomeSimulator;
use payments_frontdoor::idempotency::memory::InMemoryIdempotencyStore;
use payments_frontdoor::idempotency::store_redis::RedisIdempotencyStore;
use payments_frontdoor::idempotency::IdempotencyStore;
use payments_frontdoor::limiter::fixed_window::FixedWindowLimiter;
use payments_frontdoor::metrics::counters::PaymentMetrics;
use payments_frontdoor::service::payment_service::{PaymentService, ServiceSettings};
use payments_frontdoor::task::PeriodicTask;
use payments_frontdoor::{build_router, AppState};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env();
    init_tracing(cfg.json_logs);

    let mut purge: Option<PeriodicTask> = None;
    let store: Arc<dyn IdempotencyStore> = match cfg.store_backend {
        StoreBackend::Redis => Arc::new(RedisIdempotencyStore::new(&cfg.redis_url)?),
        StoreBackend::Memory => {
            let memory = InMemoryIdempotencyStore::new();
            purge = Some(memory.spawn_purge(cfg.purge_interval));
            Arc::new(memory)
        }
    };
    tokio::time::timeout(cfg.store_timeout.max(std::time::Duration::from_secs(5)), store.ping())
        .await
        .map_err(|_| anyhow::anyhow!("{} store ping timed out", store.name()))??;
    tracing::info!(store = store.name(), "connected to idempotency store");

    let limiter = FixedWindowLimiter::new(cfg.rate_limit_capacity, cfg.rate_limit_refill);
    let refill = limiter.spawn_refill();

    let payment_service = PaymentService {
        limiter,
        store: store.clone(),
        gateway: Arc::new(OutcomeSimulator::new(cfg.failure_rate)),
        settings: ServiceSettings::from_config(&cfg),
    };

    let state = AppState {
        payment_service,
        idempotency_store: store,
        metrics: PaymentMetrics::new()?,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refill.shutdown().await;
    if let Some(purge) = purge {
        purge.shutdown().await;
    }
    tracing::info!("shut down");
    Ok(())
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
