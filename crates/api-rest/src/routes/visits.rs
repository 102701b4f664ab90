//! Clinical visits and their skin-photo attachments.

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiMultipart, ApiPath, ApiQuery, Scope};
use crate::state::AppState;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clinic_core::metrics::VisitSummary;
use clinic_core::models::{ClinicalVisit, NewVisit, SpecialtyDetails, VisitFilter};
use clinic_core::{ClinicError, RecordId};
use clinic_files::AttachmentMetadata;

/// Multipart framing on top of the photo itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Form accepted by the photo upload route.
#[derive(utoipa::ToSchema)]
pub struct PhotoUpload {
    /// JPEG, PNG, WebP or HEIC image
    #[schema(value_type = String, format = Binary)]
    pub photo: Vec<u8>,
}

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/visits", get(list_visits).post(create_visit))
        .route("/api/visits/:id", get(get_visit))
        .route("/api/visits/:id/details", put(update_visit_details))
        .route("/api/visits/:id/complete", post(complete_visit))
        .route("/api/visits/:id/cancel", post(cancel_visit))
        .route("/api/visits/:id/summary", get(visit_summary))
        .route(
            "/api/visits/:id/photos",
            post(upload_photo).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/api/visits/:id/photos/:hash", get(download_photo))
}

#[utoipa::path(
    get,
    path = "/api/visits",
    params(VisitFilter),
    responses(
        (status = 200, description = "Visits, newest first", body = [ClinicalVisit])
    )
)]
#[axum::debug_handler]
pub async fn list_visits(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiQuery(filter): ApiQuery<VisitFilter>,
) -> ApiResult<Json<Vec<ClinicalVisit>>> {
    Ok(Json(state.services.visits.list(&scope, &filter)?))
}

#[utoipa::path(
    post,
    path = "/api/visits",
    request_body = NewVisit,
    responses(
        (status = 201, description = "Visit recorded", body = ClinicalVisit),
        (status = 400, description = "Invalid findings", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn create_visit(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewVisit>,
) -> ApiResult<(StatusCode, Json<ClinicalVisit>)> {
    let visit = state.services.visits.create(&scope, input)?;
    Ok((StatusCode::CREATED, Json(visit)))
}

#[utoipa::path(
    get,
    path = "/api/visits/{id}",
    params(("id" = String, Path, description = "Visit id")),
    responses(
        (status = 200, description = "The visit", body = ClinicalVisit)
    )
)]
#[axum::debug_handler]
pub async fn get_visit(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<ClinicalVisit>> {
    Ok(Json(state.services.visits.get(&scope, &id)?))
}

#[utoipa::path(
    put,
    path = "/api/visits/{id}/details",
    params(("id" = String, Path, description = "Visit id")),
    request_body = SpecialtyDetails,
    responses(
        (status = 200, description = "Findings replaced", body = ClinicalVisit),
        (status = 409, description = "Visit is no longer in progress", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn update_visit_details(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(details): ApiJson<SpecialtyDetails>,
) -> ApiResult<Json<ClinicalVisit>> {
    Ok(Json(
        state.services.visits.update_details(&scope, &id, details)?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/visits/{id}/complete",
    params(("id" = String, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit completed", body = ClinicalVisit)
    )
)]
#[axum::debug_handler]
pub async fn complete_visit(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<ClinicalVisit>> {
    Ok(Json(state.services.visits.complete(&scope, &id)?))
}

#[utoipa::path(
    post,
    path = "/api/visits/{id}/cancel",
    params(("id" = String, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit cancelled", body = ClinicalVisit)
    )
)]
#[axum::debug_handler]
pub async fn cancel_visit(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<ClinicalVisit>> {
    Ok(Json(state.services.visits.cancel(&scope, &id)?))
}

#[utoipa::path(
    get,
    path = "/api/visits/{id}/summary",
    params(("id" = String, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit with derived metrics", body = VisitSummary)
    )
)]
#[axum::debug_handler]
pub async fn visit_summary(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<VisitSummary>> {
    Ok(Json(state.services.visits.summary(&scope, &id)?))
}

#[utoipa::path(
    post,
    path = "/api/visits/{id}/photos",
    params(("id" = String, Path, description = "Dermatology visit id")),
    request_body(content = PhotoUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Photo stored", body = AttachmentMetadata),
        (status = 400, description = "Malformed form, or a missing, empty or non-image photo", body = api_shared::ErrorEnvelope),
        (status = 413, description = "Photo exceeds the upload limit", body = api_shared::ErrorEnvelope)
    )
)]
/// Stores one skin photo against a dermatology visit.
///
/// The first file field named `photo` is used; other fields are ignored.
#[axum::debug_handler]
pub async fn upload_photo(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> ApiResult<(StatusCode, Json<AttachmentMetadata>)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("photo") {
            continue;
        }
        let filename = field.file_name().unwrap_or("photo").to_string();
        let bytes = field.bytes().await?;
        let metadata = state
            .services
            .visits
            .add_attachment(&scope, &id, &filename, &bytes)?;
        return Ok((StatusCode::CREATED, Json(metadata)));
    }
    Err(ApiError(ClinicError::invalid(
        "photo",
        "multipart field 'photo' is required",
    )))
}

#[utoipa::path(
    get,
    path = "/api/visits/{id}/photos/{hash}",
    params(
        ("id" = String, Path, description = "Visit id"),
        ("hash" = String, Path, description = "SHA-256 of the photo")
    ),
    responses(
        (status = 200, description = "Photo bytes with their detected media type"),
        (status = 404, description = "No such photo on this visit", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn download_photo(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath((id, hash)): ApiPath<(RecordId, String)>,
) -> ApiResult<impl IntoResponse> {
    let (metadata, bytes) = state.services.visits.read_attachment(&scope, &id, &hash)?;
    let content_type = metadata
        .media_type
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
