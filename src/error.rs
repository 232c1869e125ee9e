use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Failure classes surfaced by every operation of the service.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} already registered")]
    DuplicateKey(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    // Login with an unregistered natural key. Same text as `Authentication`.
    #[error("invalid credentials")]
    UnknownAccount,

    #[error("invalid credentials")]
    Authentication,

    #[error("missing token")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("storage failure")]
    Storage(#[source] anyhow::Error),

    #[error("upstream failure")]
    Upstream(#[source] anyhow::Error),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateKey(_) | AppError::UnknownAccount => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Authentication | AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::FORBIDDEN,
            AppError::Storage(_) | AppError::Upstream(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(what) => AppError::DuplicateKey(what),
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Backend(e) => AppError::Storage(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Storage(e) | AppError::Upstream(e) | AppError::Internal(e) => {
                error!(error = ?e, %status, "request failed");
            }
            _ => {}
        }
        (status, self.to_string()).into_response()
    }
}
