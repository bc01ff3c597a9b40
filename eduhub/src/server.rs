use anyhow::Result;
use axum::{routing::get, Router};
use eduhub_api::resilience::ShutdownCoordinator;
use eduhub_api::AppState;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;

pub fn app(state: AppState, metrics: PrometheusHandle) -> Router {
    let metrics_routes = Router::new().route(
        "/metrics",
        get(move || {
            let metrics = metrics.clone();
            async move { metrics.render() }
        }),
    );

    eduhub_api::routes(state).merge(metrics_routes)
}

/// Serves until the coordinator starts shutting down, then drains in-flight requests.
pub async fn serve(config: &Config, app: Router, shutdown: Arc<ShutdownCoordinator>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.triggered().await })
        .await?;

    Ok(())
}
