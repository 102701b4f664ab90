//! Prescriptions and diagnoses.

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, Scope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clinic_core::models::{
    Diagnosis, NewDiagnosis, NewPrescription, Prescription, PrescriptionStatus, ResolveDiagnosis,
};
use clinic_core::RecordId;
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/prescriptions", post(create_prescription))
        .route("/api/patients/:id/prescriptions", get(list_prescriptions))
        .route("/api/prescriptions/:id/status", put(update_prescription_status))
        .route("/api/diagnoses", post(create_diagnosis))
        .route("/api/patients/:id/diagnoses", get(list_diagnoses))
        .route("/api/diagnoses/:id/resolve", post(resolve_diagnosis))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PrescriptionStatusBody {
    pub status: PrescriptionStatus,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PrescriptionQuery {
    /// Only prescriptions that are still active
    pub active_only: Option<bool>,
}

#[utoipa::path(
    post,
    path = "/api/prescriptions",
    request_body = NewPrescription,
    responses(
        (status = 201, description = "Prescription created", body = Prescription)
    )
)]
#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewPrescription>,
) -> ApiResult<(StatusCode, Json<Prescription>)> {
    let prescription = state.services.prescriptions.create(&scope, input)?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}/prescriptions",
    params(("id" = String, Path, description = "Patient id"), PrescriptionQuery),
    responses(
        (status = 200, description = "The patient's prescriptions", body = [Prescription])
    )
)]
#[axum::debug_handler]
pub async fn list_prescriptions(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(patient_id): ApiPath<RecordId>,
    ApiQuery(query): ApiQuery<PrescriptionQuery>,
) -> ApiResult<Json<Vec<Prescription>>> {
    let active_only = query.active_only.unwrap_or(false);
    Ok(Json(state.services.prescriptions.list_for_patient(
        &scope,
        &patient_id,
        active_only,
    )?))
}

#[utoipa::path(
    put,
    path = "/api/prescriptions/{id}/status",
    params(("id" = String, Path, description = "Prescription id")),
    request_body = PrescriptionStatusBody,
    responses(
        (status = 200, description = "Status changed", body = Prescription),
        (status = 409, description = "Prescription is no longer active", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn update_prescription_status(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(body): ApiJson<PrescriptionStatusBody>,
) -> ApiResult<Json<Prescription>> {
    Ok(Json(state.services.prescriptions.update_status(
        &scope,
        &id,
        body.status,
    )?))
}

#[utoipa::path(
    post,
    path = "/api/diagnoses",
    request_body = NewDiagnosis,
    responses(
        (status = 201, description = "Diagnosis recorded", body = Diagnosis)
    )
)]
#[axum::debug_handler]
pub async fn create_diagnosis(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewDiagnosis>,
) -> ApiResult<(StatusCode, Json<Diagnosis>)> {
    let diagnosis = state.services.diagnoses.create(&scope, input)?;
    Ok((StatusCode::CREATED, Json(diagnosis)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}/diagnoses",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient's diagnoses", body = [Diagnosis])
    )
)]
#[axum::debug_handler]
pub async fn list_diagnoses(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(patient_id): ApiPath<RecordId>,
) -> ApiResult<Json<Vec<Diagnosis>>> {
    Ok(Json(
        state.services.diagnoses.list_for_patient(&scope, &patient_id)?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/diagnoses/{id}/resolve",
    params(("id" = String, Path, description = "Diagnosis id")),
    request_body = ResolveDiagnosis,
    responses(
        (status = 200, description = "Diagnosis resolved", body = Diagnosis),
        (status = 409, description = "Already resolved", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn resolve_diagnosis(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(input): ApiJson<ResolveDiagnosis>,
) -> ApiResult<Json<Diagnosis>> {
    Ok(Json(state.services.diagnoses.resolve(&scope, &id, input)?))
}
