use crate::error::ApiResult;
use crate::extractors::{AdminOnly, Authenticated};
use crate::state::AppState;
use api_shared::{HealthRes, HealthService, Principal};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use clinic_core::EntityCount;
use serde::Serialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/verify", post(verify))
        .route("/api/diagnostics", get(diagnostics))
}

/// Runtime information for administrators.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub uptime_secs: u64,
    pub environment: String,
    pub storage: String,
    /// Record counts for the caller's tenant, soft-deleted records included
    pub counts: Vec<EntityCount>,
    pub rate_limit_keys: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Liveness check. Needs no API key.
#[axum::debug_handler]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "The principal the API key resolves to", body = Principal),
        (status = 401, description = "Missing or invalid API key", body = api_shared::ErrorEnvelope)
    )
)]
/// Echoes the principal behind the caller's API key.
#[axum::debug_handler]
pub async fn verify(Authenticated(principal): Authenticated) -> Json<Principal> {
    Json(principal)
}

#[utoipa::path(
    get,
    path = "/api/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = Diagnostics),
        (status = 403, description = "Caller is not an admin", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn diagnostics(
    State(state): State<AppState>,
    AdminOnly(principal): AdminOnly,
) -> ApiResult<Json<Diagnostics>> {
    let counts = state
        .services
        .stores()
        .tenant_counts(&principal.tenant_id)?;

    Ok(Json(Diagnostics {
        uptime_secs: state.started_at.elapsed().as_secs(),
        environment: state.config.environment().to_string(),
        storage: state.config.storage().to_string(),
        counts,
        rate_limit_keys: state.limiter.tracked_keys(),
    }))
}
