use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Check the score store and the coordinator.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let score_store = match state.score_store().health_check().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "score store health check failed");
            false
        }
    };

    let coordinator = state.coordinator_alive();
    if !coordinator {
        warn!("game coordinator is not running");
    }

    HealthResponse::from_checks(score_store, coordinator)
}
