//! Appointments, recurring series and the waitlist.

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, Scope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clinic_core::models::{
    Appointment, AppointmentFilter, NewAppointment, NewRecurringSeries, NewWaitlistEntry,
    Reschedule, StatusChange, WaitlistEntry,
};
use clinic_core::services::{CancelledSeries, ScheduledSeries, WaitlistBooking};
use clinic_core::{Page, PageRequest, RecordId};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route("/api/appointments/:id", get(get_appointment))
        .route("/api/appointments/:id/status", put(update_appointment_status))
        .route("/api/appointments/:id/reschedule", put(reschedule_appointment))
        .route("/api/recurring-appointments", post(create_series))
        .route("/api/recurring-appointments/:id/cancel", post(cancel_series))
        .route("/api/waitlist", get(list_waitlist).post(add_to_waitlist))
        .route("/api/waitlist/:id/offer", post(offer_slot))
        .route("/api/waitlist/:id/book", post(book_from_waitlist))
        .route("/api/waitlist/:id/cancel", post(cancel_waitlist_entry))
}

// ===== APPOINTMENTS =====

#[utoipa::path(
    get,
    path = "/api/appointments",
    params(AppointmentFilter, PageRequest),
    responses(
        (status = 200, description = "Appointments ordered by start time", body = clinic_core::pagination::AppointmentPage)
    )
)]
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<Appointment>>> {
    Ok(Json(state.services.appointments.list(&scope, &filter, &page)?))
}

#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = NewAppointment,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 409, description = "Provider already booked for that time", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewAppointment>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let appointment = state.services.appointments.create(&scope, input)?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "The appointment", body = Appointment)
    )
)]
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.services.appointments.get(&scope, &id)?))
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/status",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status changed", body = Appointment),
        (status = 409, description = "Transition not allowed", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(change): ApiJson<StatusChange>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(
        state.services.appointments.update_status(&scope, &id, change)?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/reschedule",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = Reschedule,
    responses(
        (status = 200, description = "Appointment moved", body = Appointment)
    )
)]
#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(input): ApiJson<Reschedule>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(
        state.services.appointments.reschedule(&scope, &id, input)?,
    ))
}

// ===== RECURRING SERIES =====

#[utoipa::path(
    post,
    path = "/api/recurring-appointments",
    request_body = NewRecurringSeries,
    responses(
        (status = 201, description = "Series and its occurrences", body = ScheduledSeries)
    )
)]
#[axum::debug_handler]
pub async fn create_series(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewRecurringSeries>,
) -> ApiResult<(StatusCode, Json<ScheduledSeries>)> {
    let scheduled = state.services.recurring.create_series(&scope, input)?;
    Ok((StatusCode::CREATED, Json(scheduled)))
}

#[utoipa::path(
    post,
    path = "/api/recurring-appointments/{id}/cancel",
    params(("id" = String, Path, description = "Series id")),
    responses(
        (status = 200, description = "Series cancelled", body = CancelledSeries)
    )
)]
#[axum::debug_handler]
pub async fn cancel_series(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<CancelledSeries>> {
    Ok(Json(state.services.recurring.cancel_series(&scope, &id)?))
}

// ===== WAITLIST =====

#[utoipa::path(
    get,
    path = "/api/waitlist",
    responses(
        (status = 200, description = "Waiting and offered entries, highest priority first", body = [WaitlistEntry])
    )
)]
#[axum::debug_handler]
pub async fn list_waitlist(
    State(state): State<AppState>,
    Scope(scope): Scope,
) -> ApiResult<Json<Vec<WaitlistEntry>>> {
    Ok(Json(state.services.waitlist.list_waiting(&scope)?))
}

#[utoipa::path(
    post,
    path = "/api/waitlist",
    request_body = NewWaitlistEntry,
    responses(
        (status = 201, description = "Added to the waitlist", body = WaitlistEntry)
    )
)]
#[axum::debug_handler]
pub async fn add_to_waitlist(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewWaitlistEntry>,
) -> ApiResult<(StatusCode, Json<WaitlistEntry>)> {
    let entry = state.services.waitlist.add(&scope, input)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    post,
    path = "/api/waitlist/{id}/offer",
    params(("id" = String, Path, description = "Waitlist entry id")),
    responses(
        (status = 200, description = "Slot offered", body = WaitlistEntry)
    )
)]
#[axum::debug_handler]
pub async fn offer_slot(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<WaitlistEntry>> {
    Ok(Json(state.services.waitlist.offer(&scope, &id)?))
}

#[utoipa::path(
    post,
    path = "/api/waitlist/{id}/book",
    params(("id" = String, Path, description = "Waitlist entry id")),
    request_body = NewAppointment,
    responses(
        (status = 201, description = "Appointment booked from the waitlist", body = WaitlistBooking)
    )
)]
#[axum::debug_handler]
pub async fn book_from_waitlist(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(input): ApiJson<NewAppointment>,
) -> ApiResult<(StatusCode, Json<WaitlistBooking>)> {
    let booking = state.services.waitlist.book(&scope, &id, input)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    post,
    path = "/api/waitlist/{id}/cancel",
    params(("id" = String, Path, description = "Waitlist entry id")),
    responses(
        (status = 200, description = "Entry cancelled", body = WaitlistEntry)
    )
)]
#[axum::debug_handler]
pub async fn cancel_waitlist_entry(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<WaitlistEntry>> {
    Ok(Json(state.services.waitlist.cancel(&scope, &id)?))
}
