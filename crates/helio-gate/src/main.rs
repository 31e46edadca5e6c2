// SPDX-License-Identifier: BUSL-1.1
//! `helio-gate` binary: run the edge service or check a route offline.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use helio_core::AccessGate;
use helio_gate::check::{check_route, SimulatedSession};
use helio_gate::{app, AppState, GateSettings};

/// Access gate and reverse proxy for the Helio CRM.
#[derive(Parser, Debug)]
#[command(name = "helio-gate", version, about)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log format.
    #[arg(long, value_enum, global = true, env = "HELIO_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve HTTP traffic.
    Serve {
        /// Listen port (overrides config file and HELIO_PORT).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print how the gate treats a path, without network calls.
    CheckRoute {
        /// Request path, optionally with a query string.
        path: String,
        #[arg(long, value_enum, default_value = "absent")]
        session: SimulatedSession,
    },
}

fn init_tracing(verbose: u8, format: LogFormat) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start tokio runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = GateSettings::load(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.port = port;
            }
            serve(settings).await
        }
        Commands::CheckRoute { path, session } => {
            let gate = AccessGate::new(&settings.gate).context("invalid gate configuration")?;
            let report = check_route(&gate, &settings.matcher, &path, session).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(settings: GateSettings) -> anyhow::Result<()> {
    let state = AppState::from_settings(&settings).context("building application state")?;
    let router = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        %addr,
        upstream = settings.upstream_url.as_deref().unwrap_or("-"),
        metrics = settings.metrics_enabled,
        "helio-gate listening"
    );

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("helio-gate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
