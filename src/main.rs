//! Corridor Lighting - motion-driven adaptive corridor lighting controller
//!
//! # Usage
//!
//! ```bash
//! # Defaults, or ./corridor.toml when present
//! corridor-lighting
//!
//! # Explicit config and debug logging
//! corridor-lighting --config /etc/corridor/corridor.toml --debug
//! ```
//!
//! # Environment Variables
//!
//! - `CORRIDOR_CONFIG`: Path to the TOML config (when `--config` is not given)
//! - `CORRIDOR_CORS_ORIGINS`: Comma-separated origins allowed to call the API
//! - `RUST_LOG`: Logging filter (default: info)

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use corridor_lighting::api::{create_app, ApiState};
use corridor_lighting::clock::SystemClock;
use corridor_lighting::config::ConfigSource;
use corridor_lighting::supervisor::{Supervisor, TaskName};
use corridor_lighting::{event_channel, run_event_loop, Controller, Devices, LightingConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "corridor-lighting")]
#[command(about = "Motion-driven adaptive corridor lighting controller")]
#[command(version)]
struct CliArgs {
    /// Config file to load instead of the standard search order.
    /// Unlike the search order, a missing or invalid file is fatal.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the server address (default from config: "0.0.0.0:8080")
    #[arg(short, long, value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Raise this crate's log level to debug
    #[arg(long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

// ============================================================================
// Start-up Helpers
// ============================================================================

fn init_tracing(args: &CliArgs) -> Result<()> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.debug {
        filter = filter.add_directive(
            "corridor_lighting=debug"
                .parse()
                .context("Invalid debug log directive")?,
        );
    }

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<(LightingConfig, ConfigSource)> {
    match path {
        Some(path) => {
            let config = LightingConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            info!(path = %path.display(), "Loaded lighting config from --config");
            Ok((config, ConfigSource::File(path.clone())))
        }
        None => Ok(LightingConfig::load()),
    }
}

/// Print the webhook URLs each sensor has to be configured with.
fn log_webhook_banner(config: &LightingConfig, server_addr: &str) {
    let base = match server_addr.parse::<SocketAddr>() {
        Ok(addr) if addr.ip().is_unspecified() => format!("http://<controller-ip>:{}", addr.port()),
        _ => format!("http://{server_addr}"),
    };

    info!("--- MOTION SENSOR URLs ---");
    for sensor in &config.sensors {
        info!("Sensor {} Motion URL: {}/motion?sensor={}", sensor.id, base, sensor.id);
        info!("Sensor {} End URL:    {}/motion_end?sensor={}", sensor.id, base, sensor.id);
    }
    info!("Button URL:  {}/button?event=<double_push|long_push|btn_up>", base);
    info!("Status URL:  POST {}/status", base);
    info!("--------------------------");
}

/// Serve the API until `cancel` fires.
async fn serve_http(
    listener: tokio::net::TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            info!("HTTP server received shutdown signal");
        })
        .await
        .context("HTTP server error")
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args)?;

    let (config, source) = load_config(args.config.as_ref())?;
    let server_addr = args.addr.clone().unwrap_or_else(|| config.server.addr.clone());
    let config = Arc::new(config);

    info!("--- Corridor Lighting {} Starting ---", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: {} | sensors: {} | secondary: {}",
        source,
        config.sensors.len(),
        if config.secondary.enabled { "enabled" } else { "disabled" }
    );

    let client = reqwest::Client::builder()
        .timeout(config.http.timeout())
        .build()
        .context("Failed to build HTTP client")?;
    let devices = Devices::from_config(&config, &client).context("Failed to initialise device adapters")?;
    let controller = Controller::new(config.clone(), devices, Arc::new(SystemClock));

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown");
        shutdown_token.cancel();
    });

    let mut supervisor = Supervisor::new(cancel_token.clone());

    let (events, receiver) = event_channel();
    {
        let controller = controller.clone();
        let cancel = cancel_token.clone();
        supervisor.spawn(TaskName::EventLoop, async move {
            run_event_loop(controller, receiver, cancel).await;
            Ok(())
        });
    }

    controller.bootstrap(&events).await;
    log_webhook_banner(&config, &server_addr);

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind {server_addr}"))?;
    info!("Listening on {}", server_addr);
    info!("--- Init Complete ---");

    let app = create_app(ApiState::new(controller, events));
    supervisor.spawn(TaskName::HttpServer, serve_http(listener, app, cancel_token));

    supervisor.run().await?;

    info!("Corridor Lighting shutdown complete");
    Ok(())
}
