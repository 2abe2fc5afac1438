//! Error taxonomy shared by the realtime and request/response paths.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::game::rules::RulesError;
use crate::store::StoreError;

/// Every failure a lobby or game operation can report back to a client.
#[derive(Debug, Error)]
pub enum HandBrainError {
    /// The lobby or game record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The lobby existed but is past its expiry time.
    #[error("lobby {0} has expired")]
    Expired(String),

    /// Wrong actor for the current phase or role, or a non-host starting.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Role slot held by someone else, or a piece is already selected.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The role-change debounce has not elapsed yet.
    #[error("role changes are rate limited, retry in {retry_after_ms}ms")]
    Cooldown { retry_after_ms: i64 },

    /// A prerequisite state is missing.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Malformed payload or inputs that reference the wrong square or piece.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The rules engine rejected the move.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HandBrainError {
    /// Machine-readable tag sent alongside the human readable message.
    pub fn code(&self) -> &'static str {
        match self {
            HandBrainError::NotFound(_) => "NOT_FOUND",
            HandBrainError::Expired(_) => "EXPIRED",
            HandBrainError::Forbidden(_) => "FORBIDDEN",
            HandBrainError::Conflict(_) => "CONFLICT",
            HandBrainError::Cooldown { .. } => "COOLDOWN",
            HandBrainError::Precondition(_) => "PRECONDITION",
            HandBrainError::InvalidInput(_) => "INVALID_INPUT",
            HandBrainError::IllegalMove(_) => "ILLEGAL_MOVE",
            HandBrainError::Store(_) | HandBrainError::Serialization(_) => "INTERNAL",
        }
    }

    pub fn retry_after_ms(&self) -> Option<i64> {
        match self {
            HandBrainError::Cooldown { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

impl ResponseError for HandBrainError {
    fn status_code(&self) -> StatusCode {
        match self {
            HandBrainError::NotFound(_) => StatusCode::NOT_FOUND,
            HandBrainError::Expired(_) => StatusCode::GONE,
            HandBrainError::Forbidden(_) => StatusCode::FORBIDDEN,
            HandBrainError::Conflict(_) => StatusCode::CONFLICT,
            HandBrainError::Cooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
            HandBrainError::Precondition(_) => StatusCode::PRECONDITION_FAILED,
            HandBrainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            HandBrainError::IllegalMove(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HandBrainError::Store(_) | HandBrainError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(ms) = self.retry_after_ms() {
            // Retry-After is whole seconds, never round down to zero.
            let secs = (ms.max(0) + 999) / 1000;
            builder.insert_header((header::RETRY_AFTER, secs.to_string()));
        }
        builder.json(json!({
            "error": self.to_string(),
            "code": self.code(),
            "retryAfterMs": self.retry_after_ms(),
        }))
    }
}

impl From<RulesError> for HandBrainError {
    fn from(err: RulesError) -> Self {
        match err {
            RulesError::BadSquare(_) => HandBrainError::InvalidInput(err.to_string()),
            RulesError::Illegal(_) => HandBrainError::IllegalMove(err.to_string()),
            RulesError::BadPosition(_) => HandBrainError::Precondition(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, HandBrainError>;
