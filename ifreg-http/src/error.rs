use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ifreg_core::{ApiResponse, ErrorKind, RegistryError};
use thiserror::Error;

/// Error returned by every handler. Always rendered as the response envelope.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct AppError(#[from] pub RegistryError);

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::ValidationError | ErrorKind::InvalidTransition => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::DuplicateKey => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(RegistryError::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self(RegistryError::validation(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = %self.0.kind(), "{}", self.0);
        } else {
            tracing::debug!(kind = %self.0.kind(), "{}", self.0);
        }
        (status, Json(ApiResponse::<()>::error(&self.0))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
