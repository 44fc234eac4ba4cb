use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::models::HealthConfig;
use crate::infrastructure::mcp::manager::ConnectionManager;

/// Scheduled health checks and capability refreshes for a manager.
///
/// Runs [`ConnectionManager::health_check`] every `check_interval` and a bulk
/// [`ConnectionManager::refresh_capabilities`] every `refresh_interval` until a
/// shutdown signal arrives.
///
/// # Example
///
/// ```rust,no_run
/// use mcp_hub::domain::models::Config;
/// use mcp_hub::infrastructure::mcp::{ConnectionManager, HealthMonitor};
/// use std::sync::Arc;
/// use tokio::sync::broadcast;
///
/// # async fn example() {
/// let config = Config::default();
/// let manager = Arc::new(ConnectionManager::new(&config));
/// let (shutdown_tx, _) = broadcast::channel(1);
///
/// let monitor = HealthMonitor::new(manager, &config.health);
/// let handle = monitor.start_monitoring(shutdown_tx.subscribe());
///
/// let _ = shutdown_tx.send(());
/// let _ = handle.await;
/// # }
/// ```
pub struct HealthMonitor {
    manager: Arc<ConnectionManager>,
    check_interval: Duration,
    refresh_interval: Duration,
}

impl HealthMonitor {
    pub fn new(manager: Arc<ConnectionManager>, config: &HealthConfig) -> Self {
        Self::with_intervals(
            manager,
            Duration::from_secs(config.check_interval_secs),
            Duration::from_secs(config.refresh_interval_secs),
        )
    }

    pub fn with_intervals(
        manager: Arc<ConnectionManager>,
        check_interval: Duration,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            manager,
            check_interval,
            refresh_interval,
        }
    }

    /// Spawn the background task. Await the returned handle after sending
    /// on the shutdown channel for a graceful stop.
    pub fn start_monitoring(&self, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let manager = self.manager.clone();
        let check_interval = self.check_interval;
        let refresh_interval = self.refresh_interval;

        tokio::spawn(async move {
            let mut health_tick = tokio::time::interval(check_interval);
            let mut refresh_tick = tokio::time::interval(refresh_interval);
            health_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            refresh_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Skip first ticks (fire immediately)
            health_tick.tick().await;
            refresh_tick.tick().await;

            tracing::info!(
                check_interval_secs = check_interval.as_secs(),
                refresh_interval_secs = refresh_interval.as_secs(),
                "Started MCP health monitoring"
            );

            loop {
                tokio::select! {
                    _ = health_tick.tick() => {
                        let failed = manager.health_check().await;
                        if failed.is_empty() {
                            tracing::debug!("Health check passed for all connected servers");
                        } else {
                            tracing::warn!(
                                failed = ?failed,
                                "Health check demoted servers"
                            );
                        }
                    }

                    _ = refresh_tick.tick() => {
                        if let Err(e) = manager.refresh_capabilities(None).await {
                            tracing::error!(error = %e, "Scheduled capability refresh failed");
                        }
                    }

                    _ = shutdown_rx.recv() => {
                        tracing::info!("Received shutdown signal, stopping health monitoring");
                        break;
                    }
                }
            }

            tracing::info!("Health monitoring stopped");
        })
    }
}
