//! HTTP mapping of request errors.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use edr_protocol::EdrError;
use storage::StorageError;

/// A request failure rendered as an OGC exception document.
#[derive(Debug)]
pub struct ApiError(pub EdrError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<EdrError> for ApiError {
    fn from(e: EdrError) -> Self {
        ApiError(e)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }

        let body = serde_json::to_string(&self.0.to_exception()).unwrap_or_default();
        (
            status,
            [(header::CONTENT_TYPE, edr_protocol::media_types::JSON)],
            body,
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
