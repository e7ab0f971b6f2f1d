use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::errors::{ErrorKind, SuiteError};

/// error body returned by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Dependency => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation",
        ErrorKind::Conflict => "conflict",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Dependency => "dependency",
        ErrorKind::Internal => "internal",
    }
}

pub(crate) fn error_response(kind: ErrorKind, message: String) -> Response {
    let body = ErrorResponse {
        error: kind_name(kind).to_string(),
        message,
    };
    (status_for(kind), Json(body)).into_response()
}

impl IntoResponse for SuiteError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match kind {
            ErrorKind::Internal => error!(error = %self, "request failed"),
            ErrorKind::Dependency => warn!(error = %self, "dependency failed"),
            _ => debug!(error = %self, "request rejected"),
        }
        error_response(kind, self.to_string())
    }
}
