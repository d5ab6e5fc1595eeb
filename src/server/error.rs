// API error type: maps domain failures onto HTTP statuses and JSON bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::survey::SurveyError;

/// Every failure an endpoint can report. The JSON body is always
/// `{"success": false, "error": <message>}` so clients branch on status
/// alone.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid ballot: {0}")]
    InvalidBallot(String),

    #[error("a ballot has already been recorded for this client")]
    DuplicateVote,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SurveyError> for ApiError {
    fn from(err: SurveyError) -> Self {
        match err {
            SurveyError::InvalidBallot(message) => ApiError::InvalidBallot(message),
            SurveyError::DuplicateVote => ApiError::DuplicateVote,
            SurveyError::Store(source) => ApiError::Internal(source),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidBallot { .. } | ApiError::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::DuplicateVote => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {self}");
        }

        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
