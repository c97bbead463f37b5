//! Client for the third-party explorer API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, CACHE_CONTROL, PRAGMA};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;
use valpulse_common::{FetchError, RawValidatorRecord};

use crate::config::UpstreamConfig;

/// Header carrying the per-call correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Anything that can produce a raw validator record
#[async_trait]
pub trait ValidatorSource: Send + Sync {
    async fn fetch(&self, correlation_id: Uuid) -> Result<RawValidatorRecord, FetchError>;
}

/// Bounded retry policy. The default is a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

/// HTTP client for the fixed explorer endpoint
#[derive(Clone)]
pub struct UpstreamClient {
    url: String,
    http: HttpClient,
    timeout: Duration,
    retry: RetryPolicy,
}

impl UpstreamClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http,
            timeout,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, FetchError> {
        Ok(Self::new(config.url.clone(), config.timeout())?.with_retry(RetryPolicy {
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
        }))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_once(&self, correlation_id: Uuid) -> Result<RawValidatorRecord, FetchError> {
        // Timestamp plus random value so no intermediate cache can answer
        let query = [
            ("t", Utc::now().timestamp_millis().to_string()),
            ("r", format!("{:x}", rand::random::<u64>())),
        ];

        let request = self
            .http
            .get(&self.url)
            .query(&query)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(PRAGMA, "no-cache")
            .header(REQUEST_ID_HEADER, correlation_id.to_string());

        let exchange = async {
            let response = request.send().await.map_err(|e| self.classify(e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::UpstreamStatus(status.as_u16()));
            }

            let body = response.bytes().await.map_err(|e| self.classify(e))?;
            parse_body(&body)
        };

        // The client timeout covers the transfer; this bounds the whole exchange
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout.as_secs())),
        }
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout.as_secs())
        } else if error.is_decode() {
            FetchError::MalformedBody(error.to_string())
        } else {
            FetchError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl ValidatorSource for UpstreamClient {
    async fn fetch(&self, correlation_id: Uuid) -> Result<RawValidatorRecord, FetchError> {
        let mut attempt = 0u32;
        loop {
            let started = Instant::now();
            let result = self.fetch_once(correlation_id).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(record) => {
                    info!(
                        correlation_id = %correlation_id,
                        elapsed_ms,
                        attempt,
                        name = %record.name,
                        uptime = record.uptime,
                        delegators = record.delegators.len(),
                        stake = record.stake_amount,
                        connected = record.connected,
                        version = %record.version,
                        "Fetched validator record"
                    );
                    return Ok(record);
                }
                Err(e) => {
                    warn!(
                        correlation_id = %correlation_id,
                        elapsed_ms,
                        attempt,
                        kind = e.kind(),
                        error = %e,
                        "Upstream fetch failed"
                    );
                    if attempt >= self.retry.max_retries || !e.is_retryable() {
                        return Err(e);
                    }
                    attempt += 1;
                    tokio::time::sleep(self.retry.backoff).await;
                }
            }
        }
    }
}

/// Decode an upstream body into a record, rejecting non-JSON bodies and
/// payloads that report their own failure.
pub fn parse_body(body: &[u8]) -> Result<RawValidatorRecord, FetchError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| FetchError::MalformedBody(e.to_string()))?;
    check_business_status(&value)?;
    RawValidatorRecord::from_value(value).map_err(|e| FetchError::MalformedBody(e.to_string()))
}

fn check_business_status(value: &Value) -> Result<(), FetchError> {
    let Some(object) = value.as_object() else {
        return Err(FetchError::MalformedBody("expected a JSON object".to_string()));
    };

    let message = object
        .get("error")
        .or_else(|| object.get("message"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    if object.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(FetchError::UnsuccessfulBusinessStatus(
            message.unwrap_or("upstream flagged the request as unsuccessful").to_string(),
        ));
    }

    // An error string with no validator fields alongside it is a failure report
    let has_record_fields = ["name", "uptime", "stakeAmount", "delegators"]
        .iter()
        .any(|key| object.contains_key(*key));
    if let Some(error) = object.get("error").and_then(Value::as_str).filter(|s| !s.is_empty()) {
        if !has_record_fields {
            return Err(FetchError::UnsuccessfulBusinessStatus(error.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_body() {
        let record = parse_body(br#"{"name":"v1","uptime":99.5,"stakeAmount":10}"#).unwrap();
        assert_eq!(record.name, "v1");
        assert_eq!(record.stake_amount, 10);
    }

    #[test]
    fn test_parse_non_json_body() {
        let err = parse_body(b"<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.kind(), "malformed_body");
    }

    #[test]
    fn test_parse_non_object_body() {
        let err = parse_body(b"[1, 2, 3]").unwrap_err();
        assert_eq!(err.kind(), "malformed_body");
    }

    #[test]
    fn test_business_failure_flag() {
        let err = parse_body(br#"{"success":false,"error":"validator not found"}"#).unwrap_err();
        assert_eq!(
            err,
            FetchError::UnsuccessfulBusinessStatus("validator not found".to_string())
        );
    }

    #[test]
    fn test_bare_error_payload() {
        let err = parse_body(br#"{"error":"rate limited"}"#).unwrap_err();
        assert_eq!(err.kind(), "unsuccessful_business_status");
    }

    #[test]
    fn test_error_field_alongside_record_is_tolerated() {
        let record = parse_body(br#"{"name":"v1","error":""}"#).unwrap();
        assert_eq!(record.name, "v1");
        let record = parse_body(br#"{"name":"v1","error":"stale"}"#).unwrap();
        assert_eq!(record.name, "v1");
    }
}
