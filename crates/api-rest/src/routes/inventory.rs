use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, Scope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clinic_core::models::{InventoryItem, NewInventoryItem, StockAdjustment};
use clinic_core::{Page, PageRequest, RecordId};
use serde::Deserialize;

/// Window used by `/api/inventory/expiring` when `days` is omitted.
const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/inventory", get(list_items).post(create_item))
        .route("/api/inventory/low-stock", get(low_stock))
        .route("/api/inventory/expiring", get(expiring))
        .route("/api/inventory/:id", get(get_item).delete(delete_item))
        .route("/api/inventory/:id/adjust", post(adjust_stock))
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpiryQuery {
    /// Days ahead to look, 0 to 3650; defaults to 30
    pub days: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/inventory",
    params(PageRequest),
    responses(
        (status = 200, description = "Items ordered by name", body = clinic_core::pagination::InventoryPage)
    )
)]
#[axum::debug_handler]
pub async fn list_items(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<InventoryItem>>> {
    Ok(Json(state.services.inventory.list(&scope, &page)?))
}

#[utoipa::path(
    post,
    path = "/api/inventory",
    request_body = NewInventoryItem,
    responses(
        (status = 201, description = "Item created", body = InventoryItem),
        (status = 409, description = "SKU already used in this branch", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn create_item(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewInventoryItem>,
) -> ApiResult<(StatusCode, Json<InventoryItem>)> {
    let item = state.services.inventory.create(&scope, input)?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/low-stock",
    responses(
        (status = 200, description = "Items at or below their reorder level", body = [InventoryItem])
    )
)]
#[axum::debug_handler]
pub async fn low_stock(
    State(state): State<AppState>,
    Scope(scope): Scope,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    Ok(Json(state.services.inventory.low_stock(&scope)?))
}

#[utoipa::path(
    get,
    path = "/api/inventory/expiring",
    params(ExpiryQuery),
    responses(
        (status = 200, description = "Items expiring within the window, soonest first", body = [InventoryItem]),
        (status = 400, description = "Window out of range", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn expiring(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiQuery(query): ApiQuery<ExpiryQuery>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let days = query.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
    Ok(Json(state.services.inventory.expiring_within(&scope, days)?))
}

#[utoipa::path(
    get,
    path = "/api/inventory/{id}",
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 200, description = "The item", body = InventoryItem)
    )
)]
#[axum::debug_handler]
pub async fn get_item(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<InventoryItem>> {
    Ok(Json(state.services.inventory.get(&scope, &id)?))
}

#[utoipa::path(
    delete,
    path = "/api/inventory/{id}",
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item soft-deleted")
    )
)]
#[axum::debug_handler]
pub async fn delete_item(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<StatusCode> {
    state.services.inventory.delete(&scope, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/inventory/{id}/adjust",
    params(("id" = String, Path, description = "Item id")),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Stock adjusted", body = InventoryItem),
        (status = 409, description = "Adjustment would make stock negative", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(adjustment): ApiJson<StockAdjustment>,
) -> ApiResult<Json<InventoryItem>> {
    Ok(Json(
        state.services.inventory.adjust_stock(&scope, &id, adjustment)?,
    ))
}
