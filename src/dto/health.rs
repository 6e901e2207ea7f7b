use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the score store or the coordinator is unusable.
    pub status: String,
    /// Whether the score store answered its health check.
    pub score_store: bool,
    /// Whether the game coordinator task is still running.
    pub coordinator: bool,
}

impl HealthResponse {
    /// Build the payload from the individual checks.
    pub fn from_checks(score_store: bool, coordinator: bool) -> Self {
        let status = if score_store && coordinator {
            "ok"
        } else {
            "degraded"
        };
        Self {
            status: status.to_string(),
            score_store,
            coordinator,
        }
    }
}
