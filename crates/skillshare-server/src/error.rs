//! Error types for the talk API.
//!
//! [`ApiError`] unifies all failure modes of a `/talks` request into a
//! single enum that converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::store::StoreError;

/// Errors that can occur in the talk API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A store operation or body decode was rejected.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No route under `/talks` accepts this method and path.
    #[error("method {method} not allowed for {path}")]
    UnsupportedMethod {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// An unexpected failure inside a handler.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::MalformedBody(_) | StoreError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::UnsupportedMethod { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
