//! Application error type rendered by every handler and the auth gate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("unauthorized access")]
    Unauthorized,

    #[error("forbidden access")]
    Forbidden,

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("token error: {0}")]
    Token(anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidId(id) => AppError::InvalidIdentifier(id),
            other => AppError::Store(other),
        }
    }
}

/// `{ "message": ... }` body used for every error
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(MessageResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_store_identifier_becomes_bad_request() {
        let err = AppError::from(StoreError::InvalidId("xyz".into()));
        assert!(matches!(err, AppError::InvalidIdentifier(ref id) if id == "xyz"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "invalid identifier: xyz");
    }

    #[test]
    fn store_failures_are_server_errors() {
        let err = AppError::from(StoreError::NotAnObject);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_failures_map_to_their_status() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    }
}
