use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};

use airdrop_core::tokens::{ErrorKind, TokenError};

// ==============================================================================
// Error Type
// ==============================================================================

pub(crate) enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Unprocessable(msg)
            | Self::Internal(msg) => msg,
        };

        (status, Json(error_body(status, &message))).into_response()
    }
}

/// `{"success": false, "error": <reason phrase>, "message": <detail>}`.
pub(super) fn error_body(status: StatusCode, message: &str) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(false));
    body.insert(
        "error".into(),
        Value::String(status.canonical_reason().unwrap_or("Error").to_string()),
    );
    body.insert("message".into(), Value::String(message.to_string()));
    body
}

pub(super) fn map_token_error(err: TokenError) -> AppError {
    match err.kind() {
        ErrorKind::InvalidInput => AppError::BadRequest(err.to_string()),
        ErrorKind::NotFound => AppError::NotFound(err.to_string()),
        ErrorKind::Conflict => AppError::Conflict(err.to_string()),
        ErrorKind::CapacityExceeded => AppError::Unprocessable(err.to_string()),
        ErrorKind::StorageFailure => {
            tracing::error!(error = %err, "token storage failure");
            AppError::Internal("Internal server error".to_string())
        }
    }
}
