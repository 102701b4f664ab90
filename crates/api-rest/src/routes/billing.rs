use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, Scope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clinic_core::models::{Invoice, InvoiceFilter, NewInvoice, NewPayment};
use clinic_core::services::OutstandingBalance;
use clinic_core::{Page, PageRequest, RecordId};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", get(list_invoices).post(create_invoice))
        .route("/api/invoices/outstanding", get(outstanding_balance))
        .route("/api/invoices/:id", get(get_invoice))
        .route("/api/invoices/:id/issue", post(issue_invoice))
        .route("/api/invoices/:id/payments", post(record_payment))
        .route("/api/invoices/:id/cancel", post(cancel_invoice))
}

#[utoipa::path(
    get,
    path = "/api/invoices",
    params(InvoiceFilter, PageRequest),
    responses(
        (status = 200, description = "Invoices, newest number first", body = clinic_core::pagination::InvoicePage)
    )
)]
#[axum::debug_handler]
pub async fn list_invoices(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiQuery(filter): ApiQuery<InvoiceFilter>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<Invoice>>> {
    Ok(Json(state.services.billing.list(&scope, &filter, &page)?))
}

#[utoipa::path(
    post,
    path = "/api/invoices",
    request_body = NewInvoice,
    responses(
        (status = 201, description = "Draft invoice created", body = Invoice)
    )
)]
#[axum::debug_handler]
pub async fn create_invoice(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewInvoice>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = state.services.billing.create(&scope, input)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[utoipa::path(
    get,
    path = "/api/invoices/outstanding",
    responses(
        (status = 200, description = "Balance still owed on issued invoices", body = OutstandingBalance)
    )
)]
#[axum::debug_handler]
pub async fn outstanding_balance(
    State(state): State<AppState>,
    Scope(scope): Scope,
) -> ApiResult<Json<OutstandingBalance>> {
    Ok(Json(state.services.billing.outstanding_total(&scope)?))
}

#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "The invoice", body = Invoice)
    )
)]
#[axum::debug_handler]
pub async fn get_invoice(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.services.billing.get(&scope, &id)?))
}

#[utoipa::path(
    post,
    path = "/api/invoices/{id}/issue",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice issued", body = Invoice),
        (status = 409, description = "Invoice is not a draft", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn issue_invoice(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.services.billing.issue(&scope, &id)?))
}

#[utoipa::path(
    post,
    path = "/api/invoices/{id}/payments",
    params(("id" = String, Path, description = "Invoice id")),
    request_body = NewPayment,
    responses(
        (status = 200, description = "Payment applied", body = Invoice),
        (status = 409, description = "Invoice cannot take this payment", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn record_payment(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(input): ApiJson<NewPayment>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(
        state.services.billing.record_payment(&scope, &id, input)?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/invoices/{id}/cancel",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice cancelled", body = Invoice)
    )
)]
#[axum::debug_handler]
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.services.billing.cancel(&scope, &id)?))
}
