//! Validator metrics service.
//!
//! Pulls the tracked validator's record from the explorer API, derives the
//! dashboard metrics and serves them as a never-cached JSON envelope. When the
//! explorer fails in any way the envelope carries the fallback snapshot instead.

use std::future::Future;
use std::sync::Arc;
use tracing::info;
use valpulse_common::{PulseError, PulseResult};

pub mod api;
pub mod config;
pub mod service;
pub mod telemetry;
pub mod upstream;

use config::ServiceConfig;
use service::MetricsService;
use telemetry::Telemetry;
use upstream::UpstreamClient;

/// Wire the upstream client, service and router from configuration and serve
/// until `shutdown_signal` completes.
pub async fn run(
    config: ServiceConfig,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> PulseResult<()> {
    config.validate()?;

    let upstream = UpstreamClient::from_config(&config.upstream)?;
    info!(
        url = upstream.url(),
        timeout_secs = config.upstream.timeout_secs,
        max_retries = config.upstream.max_retries,
        "Upstream client ready"
    );

    let telemetry = Arc::new(
        Telemetry::new().map_err(|e| PulseError::Internal(format!("Metrics registry: {}", e)))?,
    );
    let service =
        Arc::new(MetricsService::new(Arc::new(upstream)).with_telemetry(telemetry.clone()));
    let router = api::create_router(service, telemetry, config.api.concurrency_limit);

    api::serve(config.bind_addr()?, router, shutdown_signal).await
}
