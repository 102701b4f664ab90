//! Maps [`ClinicError`] to HTTP responses.

use crate::middleware::correlation;
use api_shared::ErrorEnvelope;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clinic_core::{ClinicError, ErrorKind};

/// Status code for each error kind. This is the only place the mapping lives.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden | ErrorKind::TenantIsolation => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error returned by every handler and middleware.
#[derive(Debug)]
pub struct ApiError(pub ClinicError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ClinicError> for ApiError {
    fn from(error: ClinicError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ClinicError::invalid("body", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(ClinicError::invalid("path", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ClinicError::invalid("query", rejection.body_text()))
    }
}

/// Body-limit failures become 413; anything else is a malformed upload.
fn multipart_failure(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError(ClinicError::PayloadTooLarge(message))
    } else {
        ApiError(ClinicError::invalid("photo", message))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        multipart_failure(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        multipart_failure(error.status(), error.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        let context = correlation::current();
        let trace_id = context.as_ref().map(|c| c.correlation_id.clone());
        // Outside a request there is no configured environment; redact.
        let redact = context.map_or(true, |c| c.redact_internal);

        let message = if status.is_server_error() {
            tracing::error!("request failed with {}: {}", status, self.0);
            if redact {
                status
                    .canonical_reason()
                    .unwrap_or("Internal Server Error")
                    .to_string()
            } else {
                self.0.to_string()
            }
        } else if self.0.field_errors().is_some() {
            "Validation failed".to_string()
        } else {
            self.0.to_string()
        };

        let mut envelope = ErrorEnvelope::new(message, trace_id);
        if let Some(fields) = self.0.field_errors() {
            envelope = envelope.with_errors(fields.as_map().clone());
        }
        (status, Json(envelope)).into_response()
    }
}
