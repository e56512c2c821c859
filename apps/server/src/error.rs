//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The generation service failed or answered in the wrong shape.
    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str, id: &str) -> Self {
        Self::NotFound(format!("{} {} not found", what, id))
    }

    /// `204` when a delete removed something, `404` otherwise.
    pub fn removed(found: bool, what: &str, id: &str) -> ApiResult<StatusCode> {
        if found {
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(Self::not_found(what, id))
        }
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "generation_failed"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl From<qsleads_core::Error> for ApiError {
    fn from(error: qsleads_core::Error) -> Self {
        match error {
            qsleads_core::Error::Validation(message) => ApiError::BadRequest(message),
            qsleads_core::Error::Generation(message) => ApiError::BadGateway(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            tracing::error!("{} ({}): {}", status, code, self);
        } else {
            tracing::debug!("{} ({}): {}", status, code, self);
        }
        let body = Json(json!({ "code": code, "message": self.to_string() }));
        (status, body).into_response()
    }
}
