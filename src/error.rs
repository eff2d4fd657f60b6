use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::envelope::EnvelopeError;
use crate::store::StoreError;

/// Application error type
///
/// Bodies are plain text, except for [`AppError::NonUser`] which answers
/// with `{"user": "<username>"}` so clients can tell which lookup failed.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("user {0} does not exist")]
    NonUser(String),

    #[error("{0}")]
    NotFound(String),

    /// Server-side failure with a caller-supplied message
    #[error("{0}")]
    Errored(String),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Payload(#[from] EnvelopeError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NonUser(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::UnknownUser(_)) => StatusCode::NOT_FOUND,
            AppError::Errored(_) | AppError::Store(_) | AppError::Payload(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            AppError::NonUser(username) | AppError::Store(StoreError::UnknownUser(username)) => {
                tracing::warn!(username = %username, "Request for non-existent user");
                let body = json!({ "user": username }).to_string();
                (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
            }
            other => {
                let message = other.to_string();
                if status.is_server_error() {
                    tracing::error!("{}", message);
                } else {
                    tracing::info!(status = status.as_u16(), "{}", message);
                }
                (status, message).into_response()
            }
        }
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
