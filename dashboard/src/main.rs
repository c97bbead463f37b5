use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use valpulse_dashboard::config::DashboardConfig;
use valpulse_dashboard::render::render;
use valpulse_dashboard::{RefreshOutcome, RefreshScheduler};
use valpulse_sdk::MetricsClient;

#[derive(Parser)]
#[command(name = "valpulse-dashboard")]
#[command(about = "Terminal dashboard polling the validator metrics service")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "dashboard.toml")]
    config: PathBuf,

    /// Metrics service base URL
    #[arg(long)]
    service_url: Option<String>,

    /// Seconds between scheduled polls
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    /// Poll once, print and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = DashboardConfig::load(Some(args.config.as_path()))?;
    if let Some(url) = args.service_url {
        config.service_url = url;
    }
    if let Some(secs) = args.poll_interval_secs {
        config.poll_interval_secs = secs;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("valpulse_dashboard={}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    config.validate()?;
    info!("Metrics service: {}", config.service_url);

    let client = MetricsClient::with_timeout(config.service_url.clone(), config.request_timeout())?;
    let scheduler = Arc::new(RefreshScheduler::new(Arc::new(client), config.poll_interval()));

    if args.once {
        let outcome = scheduler.refresh().await;
        println!("{}", render(&scheduler.state(), chrono::Utc::now()));
        if outcome != RefreshOutcome::Completed {
            anyhow::bail!("poll did not complete: {:?}", outcome);
        }
        return Ok(());
    }

    let mut updates = scheduler.subscribe();
    scheduler.start();
    info!("Press Enter to refresh now, Ctrl-C to quit");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_rendered = None;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if state.is_settled() && state.last_attempt != last_rendered {
                    last_rendered = state.last_attempt;
                    println!("{}", render(&state, chrono::Utc::now()));
                }
            }
            line = input.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => {
                        // Off the loop, so rendering and Ctrl-C stay live during the call
                        let scheduler = scheduler.clone();
                        tokio::spawn(async move {
                            if scheduler.refresh().await == RefreshOutcome::AlreadyRefreshing {
                                info!("Refresh already in progress");
                            }
                        });
                    }
                    // stdin closed; keep polling on the timer
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    scheduler.stop();
    Ok(())
}
