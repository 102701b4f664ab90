use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use clinic_core::ClinicError;

/// Fails the request with 504 once the configured request timeout has elapsed.
pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let limit = state.config.request_timeout();
    let path = req.uri().path().to_string();

    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!("request to {} timed out after {:?}", path, limit);
            ApiError::from(ClinicError::Timeout(format!(
                "request exceeded {}ms",
                limit.as_millis()
            )))
            .into_response()
        }
    }
}
