//! HTTP error response handling for the API
//!
//! Conversions from ingestion failures and crate errors to HTTP responses
//! with the matching status code and a JSON error body.

use crate::error::{ApiError, Error, ErrorDetail, FormError, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// A failed ingestion answers with its code class (400 or 500)
impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error = ApiError {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: None,
            },
        };

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Without a source error there is no status to derive
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
