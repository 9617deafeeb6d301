use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Request counters exposed on `/metrics`.
#[derive(Clone)]
pub struct PaymentMetrics {
    registry: Arc<Registry>,
    requests_total: IntCounter,
    requests_failed: IntCounter,
}

impl PaymentMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Registers both counters into `registry`.
    ///
    /// # Errors
    /// Fails when a counter with the same name is already registered.
    pub fn with_registry<R: Into<Arc<Registry>>>(registry: R) -> Result<Self, prometheus::Error> {
        let registry = registry.into();
        let requests_total = IntCounter::with_opts(Opts::new(
            "payment_requests_total",
            "Total number of payment requests received",
        ))?;
        let requests_failed = IntCounter::with_opts(Opts::new(
            "payment_requests_failed",
            "Total number of failed payment requests",
        ))?;
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(requests_failed.clone()))?;
        Ok(Self {
            registry,
            requests_total,
            requests_failed,
        })
    }

    pub fn record_received(&self) {
        self.requests_total.inc();
    }

    pub fn record_failed(&self) {
        self.requests_failed.inc();
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.get()
    }

    pub fn requests_failed(&self) -> u64 {
        self.requests_failed.get()
    }

    /// Renders the registry in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
