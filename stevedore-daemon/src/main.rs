//! Daemon entry point for `stevedored`.

use std::net::SocketAddr;
use std::sync::Arc;

use stevedore_runtime::api::{ApiState, api_router};
use stevedore_runtime::config::DaemonConfig;
use stevedore_runtime::docker::{DockerExportEngine, DockerImageStore, docker_builder};
use stevedore_runtime::export::ImageExportService;
use stevedore_runtime::store::Namespace;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_log();

    let config = DaemonConfig::load();
    info!(
        "starting stevedored (namespace {}, docker host {})",
        config.namespace,
        config.docker_host.as_deref().unwrap_or("local socket")
    );

    // Fail fast when the Docker backend is unreachable, rather than on the
    // first request.
    docker_builder().await?;

    let images = Arc::new(ImageExportService::new(
        Namespace::new(config.namespace.clone()),
        Arc::new(DockerImageStore),
        Arc::new(DockerExportEngine),
    ));
    let router = api_router(ApiState {
        images,
        export_pipe_bytes: config.export_pipe_bytes,
    });

    let addr: SocketAddr = format!("{}:{}", config.bind_host, config.api_port).parse()?;
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to install ctrl-c handler: {err}");
        return;
    }
    info!("shutting down stevedored");
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}
