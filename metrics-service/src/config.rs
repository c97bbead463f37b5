use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use valpulse_common::{PulseError, PulseResult};

/// Environment variable prefix, e.g. `VALPULSE__UPSTREAM__TIMEOUT_SECS=20`
pub const ENV_PREFIX: &str = "VALPULSE";

/// Metrics service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Explorer API configuration
    pub upstream: UpstreamConfig,

    /// HTTP API configuration
    pub api: ApiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Explorer API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Fixed explorer endpoint for the single tracked validator
    pub url: String,

    /// Hard timeout for one upstream call
    pub timeout_secs: u64,

    /// Extra attempts after a retryable failure. 0 means a single attempt.
    pub max_retries: u32,

    /// Pause between attempts
    pub retry_backoff_ms: u64,
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Maximum requests served concurrently
    pub concurrency_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "https://explorer.example.org/api/validators/primary".to_string(),
            timeout_secs: 15,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            concurrency_limit: 64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl ServiceConfig {
    /// Load configuration from an optional TOML file layered with environment
    /// variables. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> PulseResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| PulseError::Config(format!("Failed to read configuration: {}", e)))?;

        config
            .try_deserialize()
            .map_err(|e| PulseError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> PulseResult<()> {
        if self.upstream.url.is_empty() {
            return Err(PulseError::Config("Upstream URL cannot be empty".to_string()));
        }

        if !self.upstream.url.starts_with("http://") && !self.upstream.url.starts_with("https://") {
            return Err(PulseError::Config(format!(
                "Upstream URL must be http(s): {}",
                self.upstream.url
            )));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(PulseError::Config("Upstream timeout must be greater than 0".to_string()));
        }

        if self.api.port == 0 {
            return Err(PulseError::Config("API port must be greater than 0".to_string()));
        }

        if self.api.concurrency_limit == 0 {
            return Err(PulseError::Config("Concurrency limit must be greater than 0".to_string()));
        }

        self.bind_addr()?;

        Ok(())
    }

    /// Socket address the API listens on
    pub fn bind_addr(&self) -> PulseResult<SocketAddr> {
        format!("{}:{}", self.api.host, self.api.port)
            .parse()
            .map_err(|e| PulseError::Config(format!("Invalid API bind address: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.upstream.timeout(), Duration::from_secs(15));
        assert_eq!(config.upstream.max_retries, 0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.upstream.url = "ftp://nope".to_string();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.upstream.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.api.host = "not a host".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_partial_file() {
        let path = std::env::temp_dir().join(format!("valpulse-test-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        let contents = r#"
[upstream]
url = "http://127.0.0.1:9000/validator"
max_retries = 2

[api]
port = 9191
"#;
        file.write_all(contents.as_bytes()).unwrap();

        let config = ServiceConfig::load(Some(path.as_path())).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.upstream.url, "http://127.0.0.1:9000/validator");
        assert_eq!(config.upstream.max_retries, 2);
        assert_eq!(config.upstream.timeout_secs, 15);
        assert_eq!(config.api.port, 9191);
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = Path::new("/nonexistent/valpulse.toml");
        let config = ServiceConfig::load(Some(path)).unwrap();
        assert_eq!(config.api.port, ApiConfig::default().port);
    }
}
