use crate::domain::payment::PaymentRequest;
use crate::error::ClientError;
use reqwest::StatusCode;
use std::time::Duration;

/// One network round trip to the payment endpoint.
#[async_trait::async_trait]
pub trait PaymentTransport: Send + Sync {
    async fn send(&self, request: &PaymentRequest) -> Result<StatusCode, ClientError>;
}

pub struct HttpTransport {
    pub endpoint: String,
    pub timeout: Duration,
    pub client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(10),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl PaymentTransport for HttpTransport {
    async fn send(&self, request: &PaymentRequest) -> Result<StatusCode, ClientError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(resp.status())
    }
}
