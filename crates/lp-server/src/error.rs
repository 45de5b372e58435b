//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`lp_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on pipeline calls.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: lp_core::Error,
}

impl AppError {
    pub fn new(inner: lp_core::Error) -> Self {
        Self { inner }
    }

    fn code(&self) -> &'static str {
        match &self.inner {
            lp_core::Error::NotFound { .. } => "not_found",
            lp_core::Error::Validation(_) => "validation_error",
            lp_core::Error::PayloadTooLarge { .. } => "payload_too_large",
            lp_core::Error::Decode(_) => "decode_error",
            lp_core::Error::SchemaUnsupported(_) => "schema_unsupported",
            lp_core::Error::Database { .. } => "database_error",
            lp_core::Error::Io { .. } => "io_error",
            lp_core::Error::Internal(_) => "internal_error",
        }
    }
}

impl From<lp_core::Error> for AppError {
    fn from(e: lp_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
