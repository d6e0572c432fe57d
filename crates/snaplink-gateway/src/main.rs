use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use snaplink_gateway::cli::{StorageBackendArg, CLI};
use snaplink_gateway::{App, AppState};
use snaplink_generator::RandomGenerator;
use snaplink_storage::{InMemoryRepository, MySqlRepository};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    snaplink_telemetry::init_tracing(config.log_format.into())?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        log_format = %config.log_format,
        "starting gateway server"
    );

    let generator = RandomGenerator::with_length(config.code_length);
    let state = match config.storage {
        StorageBackendArg::InMemory => AppState::with_repository(
            Arc::new(InMemoryRepository::new()),
            generator,
            config.base_url,
            config.public_limit,
        ),
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(
                &mysql_dsn,
                Duration::from_secs(config.mysql_acquire_timeout_secs),
            )
            .await
            .context("failed to connect to mysql")?;
            repository
                .ensure_schema()
                .await
                .context("failed to create mysql schema")?;
            AppState::with_repository(
                Arc::new(repository),
                generator,
                config.base_url,
                config.public_limit,
            )
        }
    };

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
    }
}
