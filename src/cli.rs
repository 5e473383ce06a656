use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::app_state::AppState;
use crate::config_loader::{load_config, ServiceConfig};
use crate::features::encode;
use crate::response::PredictionResult;
use crate::web::build_router;

/// Top-level CLI interface
#[derive(Parser)]
#[command(name = "hepatitis_risk", version, about = "Hepatitis risk prediction service")]
pub struct Cli {
    /// Configuration file (defaults to hepatitis.toml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the prediction API (the default)
    Serve {
        /// Host/IP to bind, overrides server.host
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overrides server.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Score a single JSON payload with the configured predictor
    Score {
        /// Payload file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;

    match cli.command.unwrap_or(Commands::Serve { host: None, port: None }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Commands::Score { input } => {
            let result = score(&config, &input).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

/// Load artifacts, bind, and serve until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::initialize(&config).await);
    let app = build_router(state, config.server.cors_permissive);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

fn read_payload(input: &str) -> anyhow::Result<Value> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading payload from stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(input)).with_context(|| format!("reading {input}"))?
    };
    serde_json::from_str(&raw).context("payload is not valid JSON")
}

/// Run one payload through the encoder and predictor outside the server.
pub async fn score(config: &ServiceConfig, input: &str) -> anyhow::Result<PredictionResult> {
    let payload = read_payload(input)?;
    let fields = payload
        .as_object()
        .context("payload must be a JSON object")?;

    let state = AppState::initialize(config).await;
    let features = encode(fields, &state.defaults)?;
    Ok(state.predictor.predict(&features)?)
}
