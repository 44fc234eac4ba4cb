//! Watch command: keep connections monitored until interrupted.

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use crate::cli::output::output;
use crate::domain::models::Config;
use crate::infrastructure::mcp::HealthMonitor;

use super::status::StatusOutput;

pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let manager = super::connect(config).await;

    output(
        &StatusOutput {
            connections: manager.get_all_connections(),
            circuits: manager.circuit_stats(),
        },
        json_mode,
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let monitor = HealthMonitor::new(manager.clone(), &config.health);
    let handle = monitor.start_monitoring(shutdown_rx);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Interrupted, shutting down");

    let _ = shutdown_tx.send(());
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "Health monitor task ended abnormally");
    }

    manager.disconnect_all().await;

    output(
        &StatusOutput {
            connections: manager.get_all_connections(),
            circuits: manager.circuit_stats(),
        },
        json_mode,
    );
    Ok(())
}
