// Background tasks for PostPilot Backend
// Proactive Instagram token refresh: long-lived tokens cannot be renewed
// once expired, so the sweep runs ahead of token_expires_at.
// Scheduled posts are NOT auto-published - publishing stays user-triggered.

use std::sync::Arc;
use tracing::{error, info};

use crate::services::instagram::InstagramService;

/// Spawn the periodic token refresh sweep.
/// Interval and lead window come from configuration; the task is disabled
/// entirely with ENABLE_TOKEN_REFRESH_TASK=false (tests, one-off tooling).
pub fn spawn_token_refresh_task(instagram_service: Arc<InstagramService>) {
    let config = crate::app_config::config();

    if !config.enable_token_refresh_task {
        info!("Instagram token refresh task is disabled in configuration");
        return;
    }

    let interval_secs = config.instagram.token_refresh_interval_secs;

    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            match instagram_service.refresh_expiring_tokens().await {
                Ok(0) => {},
                Ok(count) => {
                    info!("Token refresh sweep renewed {} Instagram tokens", count);
                },
                Err(e) => {
                    error!("Token refresh sweep failed: {}", e);
                },
            }
        }
    });
}
