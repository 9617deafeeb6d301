use anyhow::Result;
use payments_frontdoor::client::retrying_client::{RetryPolicy, RetryingClient};
use payments_frontdoor::config::AppConfig;
use payments_frontdoor::domain::payment::PaymentRequest;
use tracing_subscriber::EnvFilter;

/// Drives `LOAD_CLIENTS` concurrent retrying callers against `PAY_ENDPOINT`.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let client = RetryingClient::http(cfg.pay_endpoint.clone(), RetryPolicy::from_config(&cfg));

    let mut handles = Vec::with_capacity(cfg.load_clients);
    for i in 0..cfg.load_clients {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let request = PaymentRequest::new(format!("user{}", i), 100.0, format!("key-{}", i));
            client.submit(&request).await
        }));
    }

    let mut succeeded = 0usize;
    let mut exhausted = 0usize;
    for handle in handles {
        match handle.await? {
            Ok(submission) => {
                succeeded += 1;
                tracing::debug!(attempts = submission.attempt_count(), "client finished");
            }
            Err(e) => {
                exhausted += 1;
                tracing::warn!("client gave up: {}", e);
            }
        }
    }

    tracing::info!(succeeded, exhausted, "load run complete");
    Ok(())
}
