use anyhow::{bail, Result};
use eduhub_api::observability::init_logging;
use eduhub_api::resilience::{ShutdownCoordinator, SignalListener};
use eduhub_api::{AppState, ConnectionManager};
use eduhub_core::{ConnectionError, PlatformSettings};
use eduhub_storage::PlatformAppConnector;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod config;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::load()?;
    init_logging(&config.logging())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    info!("Starting EduHub backend");

    let settings = match PlatformSettings::from_process_env() {
        Ok(settings) => settings,
        Err(ConnectionError::Configuration(violations)) => {
            for violation in &violations {
                error!("Invalid platform configuration: {}", violation);
            }
            bail!(
                "refusing to start with {} configuration violation(s)",
                violations.len()
            );
        }
        Err(e) => return Err(e.into()),
    };
    info!("Platform settings loaded ({:?} context)", settings.context);

    let metrics = PrometheusBuilder::new().install_recorder()?;

    let connector = PlatformAppConnector::new(settings).with_endpoints(config.endpoints());
    let manager = Arc::new(ConnectionManager::new(
        Arc::new(connector),
        config.connection(),
    ));

    let coordinator = Arc::new(ShutdownCoordinator::new(config.shutdown_timeout()));
    coordinator.register_component(manager.clone()).await;
    SignalListener::new(coordinator.clone()).spawn();

    // A termination signal during the first connection abandons it.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        let coordinator = coordinator.clone();
        async move {
            coordinator.triggered().await;
            cancel.cancel();
        }
    });

    if let Err(e) = manager.initialize(&cancel).await {
        error!("Could not connect to the platform: {}", e);
        coordinator.shutdown().await;
        return Err(e.into());
    }

    let app = server::app(AppState::new(manager), metrics);
    server::serve(&config, app, coordinator.clone()).await?;

    // No-op when a signal already drove the shutdown.
    coordinator.shutdown().await;
    info!("EduHub backend stopped");
    Ok(())
}
