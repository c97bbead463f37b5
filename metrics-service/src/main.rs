use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use valpulse_metrics_service::config::ServiceConfig;

#[derive(Parser)]
#[command(name = "valpulse-metrics-service")]
#[command(about = "Validator metrics service with explorer fallback")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "valpulse.toml")]
    config: PathBuf,

    /// Explorer endpoint for the tracked validator
    #[arg(long)]
    upstream_url: Option<String>,

    /// Upstream timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// API bind host
    #[arg(long)]
    host: Option<String>,

    /// API port
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = ServiceConfig::load(Some(args.config.as_path()))?;

    // Override config with command line arguments
    if let Some(url) = args.upstream_url {
        config.upstream.url = url;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.upstream.timeout_secs = timeout_secs;
    }
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "valpulse_metrics_service={},tower_http=info",
                    config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_line_number(true))
        .init();

    info!("Starting validator metrics service");

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }

    info!("Upstream URL: {}", config.upstream.url);
    info!("API address: {}:{}", config.api.host, config.api.port);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    valpulse_metrics_service::run(config, shutdown_signal).await?;

    info!("Validator metrics service stopped");
    Ok(())
}
