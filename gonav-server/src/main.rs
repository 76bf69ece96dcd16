//! `gonav-server` — HTTP gateway process.
//!
//! Owns the single [`gonav_engine::Engine`] instance for the process's
//! lifetime, parses CLI flags and a config file, and serves the three JSON
//! endpoints until a shutdown signal arrives.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use gonav_engine::config::GonavConfig;
use gonav_engine::Engine;
use gonav_server::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "gonav-server")]
#[command(about = "HTTP gateway for the gonav progressive analysis engine")]
#[command(version)]
struct Args {
    /// Path to `gonav.toml`. Missing or invalid files fall back to defaults.
    #[arg(long, default_value = "gonav.toml")]
    config: PathBuf,

    /// Sandbox base directory the engine fetches modules into.
    #[arg(long, default_value = "/tmp/gonav-cache")]
    sandbox_dir: PathBuf,

    /// Overrides the configured port.
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.parse().unwrap_or_default()),
        )
        .init();

    let mut config = GonavConfig::load(&args.config);
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let port = config.server.port;
    let engine = Arc::new(
        Engine::new(config, args.sandbox_dir.clone())
            .context("failed to initialize the analysis engine")?,
    );

    let app = gonav_server::build_app(AppState { engine: engine.clone() });

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, sandbox = %args.sandbox_dir.display(), "gonav-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server loop failed")?;

    info!("draining in-flight dependency downloads");
    engine
        .shutdown(std::time::Duration::from_secs(30))
        .await
        .context("failed to drain dependency queue cleanly")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gonav-server: {e:#}");
            ExitCode::FAILURE
        }
    }
}
