use crate::error::ApiError;
use crate::middleware::rate_limit::{self, Policy};
use crate::state::AppState;
use api_shared::API_KEY_HEADER;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use clinic_core::ClinicError;
use std::time::Instant;

/// Resolves `X-API-Key` to a [`api_shared::Principal`] in the request extensions.
///
/// Requests without a key pass through unauthenticated; routes that need a caller reject them
/// through the extractors. A key that is present but unknown is rejected here, and each such
/// attempt counts against the client's auth rate limit.
pub async fn resolve_principal(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(value) = req.headers().get(API_KEY_HEADER) else {
        return next.run(req).await;
    };
    let key = match value.to_str() {
        Ok(key) => key.to_string(),
        Err(_) => return reject(&state, &req, "API key is invalid".into()),
    };

    match state.keys.authenticate(&key) {
        Ok(principal) => {
            tracing::debug!(
                "authenticated user {} of tenant {}",
                principal.user_id,
                principal.tenant_id
            );
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!("rejected API key: {}", e);
            reject(&state, &req, e.to_string())
        }
    }
}

fn reject(state: &AppState, req: &Request, message: String) -> Response {
    let caller = rate_limit::client_ip_key(req);
    if let Err(retry_after) = state.limiter.check(Policy::Auth, &caller, Instant::now()) {
        return rate_limit::too_many_requests(&caller, Policy::Auth, retry_after);
    }
    ApiError::from(ClinicError::Unauthorized(message)).into_response()
}
