//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; every [`crate::Error`] becomes
//! a JSON body naming the error, its code and the stage that failed.

use crate::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for the library error.
#[derive(Debug)]
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                stage = self.0.stage(),
                error = %self.0,
                "Request failed"
            );
        } else {
            tracing::warn!(status = %status, error = %self.0, "Rejected request");
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
            "stage": self.0.stage(),
        });

        (status, axum::Json(body)).into_response()
    }
}
