use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{dao::storage::StorageError, state::board::BoardIntegrityError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed identifiers at creation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A game with this identifier already exists.
    #[error("game `{0}` already exists")]
    AlreadyExists(String),
    /// Requested game was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Claimant is not one of the game's two participants.
    #[error("invalid claimant `{claimant}` for game `{game_id}`")]
    InvalidClaimant { game_id: String, claimant: String },
    /// No cell exists at the requested coordinates.
    #[error("no cell at ({row},{col})")]
    CellOutOfRange { row: i64, col: i64 },
    /// The same participant tried to move twice in a row.
    #[error("`{0}` already made the last move")]
    ConsecutiveMove(String),
    /// The target cell belongs to someone already.
    #[error("cell {label} is already claimed by `{occupant}`")]
    CellAlreadyClaimed { label: String, occupant: String },
    /// Stored records for a game disagree with each other.
    #[error("game `{game_id}` is in a partial state: {reason}")]
    PartialState { game_id: String, reason: String },
    /// Storage backend failed while serving the request.
    #[error("storage failure")]
    StorageFailure(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl ServiceError {
    /// Wrap a board inconsistency detected while loading `game_id`.
    pub fn partial(game_id: &str, err: BoardIntegrityError) -> Self {
        ServiceError::PartialState {
            game_id: game_id.to_owned(),
            reason: err.to_string(),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::StorageFailure(err)
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Caller is not allowed to act on this game.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::InvalidInput(reason) => AppError::BadRequest(reason),
            ServiceError::CellOutOfRange { .. } => AppError::BadRequest(message),
            ServiceError::InvalidClaimant { .. } => AppError::Forbidden(message),
            ServiceError::NotFound(what) => AppError::NotFound(what),
            ServiceError::AlreadyExists(_)
            | ServiceError::ConsecutiveMove(_)
            | ServiceError::CellAlreadyClaimed { .. } => AppError::Conflict(message),
            ServiceError::PartialState { .. } => AppError::Internal(message),
            ServiceError::StorageFailure(source) => {
                AppError::ServiceUnavailable(source.to_string())
            }
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
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
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
