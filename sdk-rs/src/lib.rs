use std::time::Duration;

use chrono::Utc;
use reqwest::header::{ACCEPT, CACHE_CONTROL, PRAGMA};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
pub use valpulse_common::{EnvelopeData, ResponseEnvelope};

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthInfo {
    pub status: String,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Clone)]
pub struct MetricsClient {
    base_url: String,
    http: HttpClient,
    timeout: Duration,
}

impl MetricsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SdkError> {
        Self::with_timeout(base_url, Duration::from_secs(20))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SdkError> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), http, timeout })
    }

    /// `timeout` must be the one `http` was built with; it is only reported back.
    pub fn with_http_client(
        base_url: impl Into<String>,
        http: HttpClient,
        timeout: Duration,
    ) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http, timeout }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, SdkError> {
        // Fresh timestamp and random value per request so no cache can answer
        let query = [
            ("t", Utc::now().timestamp_millis().to_string()),
            ("r", format!("{:x}", rand::random::<u64>())),
        ];
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&query)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SdkError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Current metrics envelope. A fallback envelope (`success == false`) is
    /// still `Ok`; only transport, status and decoding problems are errors.
    pub async fn get_metrics(&self) -> Result<ResponseEnvelope, SdkError> {
        self.get_json::<ResponseEnvelope>("/metrics").await
    }

    pub async fn get_health(&self) -> Result<HealthInfo, SdkError> {
        self.get_json::<HealthInfo>("/health").await
    }
}
