use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{dao::storage::StorageError, engine::EngineError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The game coordinator is no longer running.
    #[error("game coordinator unavailable")]
    CoordinatorGone,
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidTransition(_)
            | EngineError::PowerUpUnavailable { .. }
            | EngineError::StaleEvent(_)
            | EngineError::ArbitrationConflict(_)
            | EngineError::NotPermitted(_) => ServiceError::InvalidState(err.to_string()),
            EngineError::InvalidWager { .. } => ServiceError::InvalidInput(err.to_string()),
            EngineError::UnknownContestant(_) | EngineError::UnknownQuestion(_) => {
                ServiceError::NotFound(err.to_string())
            }
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::CoordinatorGone => {
                AppError::ServiceUnavailable("game coordinator stopped".into())
            }
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        engine::lifecycle::{InvalidTransition, QuestionEvent, QuestionPhase},
        state::game::PowerUpKind,
    };

    fn status_of(err: EngineError) -> StatusCode {
        AppError::from(ServiceError::from(err))
            .into_response()
            .status()
    }

    #[test]
    fn engine_errors_map_to_http_statuses() {
        let invalid = InvalidTransition {
            from: QuestionPhase::Hidden,
            event: QuestionEvent::Undo,
        };
        assert_eq!(status_of(invalid.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(EngineError::PowerUpUnavailable {
                contestant: Uuid::new_v4(),
                power_up: PowerUpKind::Freeze
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::InvalidWager { min: 100, max: 500 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(EngineError::UnknownQuestion(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
    }
}
