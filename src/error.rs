//! Faults that abort a request instead of producing an `ExecutionResult`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Only rejections, protocol faults, and workspace setup failures are
/// errors. Everything that happens once user code is handed to a backend is
/// reported as an `ExecutionResult` instead.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Judge returned HTTP {status}: {body}")]
    JudgeStatus { status: u16, body: String },

    #[error("Workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}

impl ExecError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        ExecError::InvalidSubmission(detail.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ExecError::UnsupportedLanguage(_) | ExecError::InvalidSubmission(_) => {
                StatusCode::BAD_REQUEST
            }
            ExecError::JudgeStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ExecError::Workspace(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ExecError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // The judge's own body is passed through untouched
        let detail = match self {
            ExecError::JudgeStatus { body, .. } => body,
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
