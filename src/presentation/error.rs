use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::error::{AuthError, DomainError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Insufficient privileges")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),
}

/// json body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Domain(e) => match e {
                DomainError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
                DomainError::DuplicateUsername => (StatusCode::CONFLICT, "duplicate_username"),
                DomainError::DuplicateEmail => (StatusCode::CONFLICT, "duplicate_email"),
                DomainError::IdentityProvider(_) => {
                    (StatusCode::BAD_GATEWAY, "identity_provider_error")
                }
                DomainError::RegistrationFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "registration_failed")
                }
                DomainError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
                DomainError::DeletionFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "deletion_failed")
                }
                DomainError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            // storage details stay in the logs
            ApiError::Domain(DomainError::Repository(_)) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }
        let body = ErrorBody {
            error: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
