//! Optional background eviction of idle limiter buckets.
//!
//! Off unless `rate_limit.idle_retention_secs` is configured; without it the
//! registry keeps every client key for the life of the process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::security::rate_limit::ClientLimiterRegistry;

/// Spawn a task that sweeps idle buckets every `interval` until shutdown.
pub fn spawn_idle_sweep(
    registry: Arc<ClientLimiterRegistry>,
    retention: Duration,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = registry.sweep_idle(retention);
                    let remaining = registry.len();
                    metrics::record_limiter_clients(remaining);
                    if removed > 0 {
                        tracing::debug!(removed, remaining, "Swept idle rate limit buckets");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Idle sweep stopping");
                    break;
                }
            }
        }
    })
}
