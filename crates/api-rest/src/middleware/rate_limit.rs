//! Fixed-window rate limiting.
//!
//! Each (policy, caller) pair gets a counter that resets when its window elapses. Callers are
//! identified by tenant and user id when authenticated, otherwise by client IP.

use crate::error::ApiError;
use crate::state::AppState;
use api_shared::{Principal, RETRY_AFTER_HEADER};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use clinic_core::{ClinicError, RateLimitConfig};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Windows are swept once the table grows past this many entries.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    Global,
    Auth,
    Sensitive,
}

impl Policy {
    /// `/api/auth/*` uses the auth policy; diagnostics and every DELETE use the sensitive one.
    pub fn for_request(method: &Method, path: &str) -> Self {
        if path.starts_with("/api/auth/") || path == "/api/auth" {
            Policy::Auth
        } else if path.starts_with("/api/diagnostics") || method == Method::DELETE {
            Policy::Sensitive
        } else {
            Policy::Global
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Global => f.write_str("global"),
            Policy::Auth => f.write_str("auth"),
            Policy::Sensitive => f.write_str("sensitive"),
        }
    }
}

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<(Policy, String), Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn limit(&self, policy: Policy) -> u32 {
        match policy {
            Policy::Global => self.config.global,
            Policy::Auth => self.config.auth,
            Policy::Sensitive => self.config.sensitive,
        }
    }

    /// Counts one request. Returns the seconds until the window resets when the limit is
    /// already used up.
    pub fn check(&self, policy: Policy, caller: &str, now: Instant) -> Result<(), u64> {
        let window_len = self.config.window;
        let limit = self.limit(policy);
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < window_len);
        }

        let window = windows
            .entry((policy, caller.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });
        if now.duration_since(window.started) >= window_len {
            window.started = now;
            window.count = 0;
        }
        if window.count >= limit {
            let remaining = window_len.saturating_sub(now.duration_since(window.started));
            return Err(retry_after_secs(remaining));
        }
        window.count += 1;
        Ok(())
    }

    /// Number of (policy, caller) windows currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .map(|w| w.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }
}

/// Whole seconds, rounded up, never zero.
fn retry_after_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

fn caller_key(req: &Request) -> String {
    match req.extensions().get::<Principal>() {
        Some(principal) => format!("user:{}:{}", principal.tenant_id, principal.user_id),
        None => client_ip_key(req),
    }
}

/// Caller key for a request with no principal.
pub fn client_ip_key(req: &Request) -> String {
    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

/// 429 envelope with `Retry-After`.
pub fn too_many_requests(caller: &str, policy: Policy, retry_after: u64) -> Response {
    tracing::warn!("rate limit exceeded for {} ({} policy)", caller, policy);
    let mut response = ApiError::from(ClinicError::RateLimitExceeded {
        policy: policy.to_string(),
        retry_after_secs: retry_after,
    })
    .into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER_HEADER, HeaderValue::from(retry_after));
    response
}

pub async fn limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let policy = Policy::for_request(req.method(), req.uri().path());
    let caller = caller_key(&req);

    match state.limiter.check(policy, &caller, Instant::now()) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => too_many_requests(&caller, policy, retry_after),
    }
}
