//! Correlation ids.
//!
//! An incoming `X-Correlation-ID` is kept when it is 1-128 characters of `[A-Za-z0-9._-]`;
//! anything else is replaced by a fresh UUID. The id is stored in the request extensions,
//! recorded on the request span, made available to error responses and echoed on the response.

use crate::state::AppState;
use api_shared::CORRELATION_ID_HEADER;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use regex::Regex;

static VALID_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]{1,128}$").expect("correlation id pattern is valid")
});

/// The correlation id of the request being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Per-request values that error responses need but cannot get from the request itself.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub redact_internal: bool,
}

tokio::task_local! {
    pub static REQUEST_CONTEXT: RequestContext;
}

/// Returns the current request's context, if called while a request is being handled.
pub fn current() -> Option<RequestContext> {
    REQUEST_CONTEXT.try_with(Clone::clone).ok()
}

fn accept_or_generate(incoming: Option<&HeaderValue>) -> String {
    incoming
        .and_then(|v| v.to_str().ok())
        .filter(|v| VALID_ID.is_match(v))
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

pub async fn propagate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let id = accept_or_generate(req.headers().get(CORRELATION_ID_HEADER));
    tracing::Span::current().record("correlation_id", id.as_str());
    req.extensions_mut().insert(CorrelationId(id.clone()));

    let context = RequestContext {
        correlation_id: id.clone(),
        redact_internal: state.config.environment().is_production(),
    };
    let mut response = REQUEST_CONTEXT.scope(context, next.run(req)).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
