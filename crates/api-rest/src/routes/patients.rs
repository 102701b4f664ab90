use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, Scope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clinic_core::models::{NewPatient, Patient, UpdatePatient};
use clinic_core::{Page, PageRequest, RecordId};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/patients", get(search_patients).post(create_patient))
        .route(
            "/api/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientSearch {
    /// Matched against names, email, phone and national id
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/patients",
    params(PatientSearch, PageRequest),
    responses(
        (status = 200, description = "Matching patients", body = clinic_core::pagination::PatientPage)
    )
)]
#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiQuery(search): ApiQuery<PatientSearch>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<Patient>>> {
    let query = search.q.unwrap_or_default();
    Ok(Json(state.services.patients.search(&scope, &query, &page)?))
}

#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = NewPatient,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid patient", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewPatient>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let patient = state.services.patients.create(&scope, input)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient", body = Patient),
        (status = 404, description = "Unknown or deleted patient", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.services.patients.get(&scope, &id)?))
}

#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = UpdatePatient,
    responses(
        (status = 200, description = "Updated patient", body = Patient)
    )
)]
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(input): ApiJson<UpdatePatient>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.services.patients.update(&scope, &id, input)?))
}

#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient soft-deleted")
    )
)]
#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<StatusCode> {
    state.services.patients.delete(&scope, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
