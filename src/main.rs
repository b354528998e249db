use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::Parser;
use ecometer::{AppState, build_app, config::EcometerConfig, observability, oracle::ProfileOracle};

#[derive(Debug, Parser)]
#[command(name = "ecometer", version, about = "AI inference energy/carbon estimation webhook")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "ecometer.toml")]
    config: PathBuf,

    /// Override the listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_exists = cli.config.exists();
    let mut config = if config_exists {
        EcometerConfig::from_file(&cli.config)?
    } else {
        EcometerConfig::default()
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }

    observability::init_tracing(&config.observability.logging)?;

    if config_exists {
        tracing::info!(path = %cli.config.display(), "configuration loaded");
    } else {
        tracing::warn!(
            path = %cli.config.display(),
            "config file not found, running with defaults"
        );
    }

    let oracle = Arc::new(ProfileOracle::bundled()?);
    tracing::info!(models = oracle.model_count(), "impact profiles loaded");

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = AppState::new(config, oracle);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "ecometer listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Resolve on SIGTERM or Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
