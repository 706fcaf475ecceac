use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether a storage backend is installed and answering health checks.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.game_store().await else {
        warn!("storage unavailable (degraded mode)");
        return HealthResponse::degraded();
    };

    if let Err(err) = store.health_check().await {
        warn!(error = %err, "storage health check failed");
        return HealthResponse::degraded();
    }

    if state.is_degraded().await {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
