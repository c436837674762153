//! # dockstream: live container state over server-sent events.
//!
//! Serves one SSE stream per subscriber, each backed by its own polling
//! session against the Docker Engine API.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dockstream_docker::EngineApiFetcher;
use dockstream_server::cli::Cli;
use dockstream_server::routes::{self, AppState};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = cli.resolve_config()?;
    let fetcher = EngineApiFetcher::new(&config.docker_host, config.fetch_timeout())?;

    let shutdown = CancellationToken::new();
    let app = routes::router(AppState::new(Arc::new(fetcher), &config, shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.listen_addr))?;
    tracing::info!(
        addr = %config.listen_addr,
        docker_host = %config.docker_host,
        poll_interval_ms = config.poll_interval_ms,
        "dockstream listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    tracing::info!("dockstream stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Resolves on Ctrl-C, after cancelling every open stream session.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested, closing streams");
    shutdown.cancel();
}
