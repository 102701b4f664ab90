//! Marketing campaigns and the leads they bring in.

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, Scope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clinic_core::models::{
    Campaign, CampaignStats, CampaignStatus, ConvertLead, Lead, LeadFilter, LeadStatus,
    NewCampaign, NewLead,
};
use clinic_core::services::LeadConversion;
use clinic_core::RecordId;
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/campaigns", get(list_campaigns).post(create_campaign))
        .route("/api/campaigns/:id/status", put(update_campaign_status))
        .route("/api/campaigns/:id/stats", get(campaign_stats))
        .route("/api/leads", get(list_leads).post(create_lead))
        .route("/api/leads/:id/status", put(update_lead_status))
        .route("/api/leads/:id/convert", post(convert_lead))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CampaignStatusBody {
    pub status: CampaignStatus,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LeadStatusBody {
    pub status: LeadStatus,
}

// ===== CAMPAIGNS =====

#[utoipa::path(
    get,
    path = "/api/campaigns",
    responses(
        (status = 200, description = "Campaigns, latest start first", body = [Campaign])
    )
)]
#[axum::debug_handler]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Scope(scope): Scope,
) -> ApiResult<Json<Vec<Campaign>>> {
    Ok(Json(state.services.crm.list_campaigns(&scope)?))
}

#[utoipa::path(
    post,
    path = "/api/campaigns",
    request_body = NewCampaign,
    responses(
        (status = 201, description = "Campaign created as a draft", body = Campaign)
    )
)]
#[axum::debug_handler]
pub async fn create_campaign(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewCampaign>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let campaign = state.services.crm.create_campaign(&scope, input)?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

#[utoipa::path(
    put,
    path = "/api/campaigns/{id}/status",
    params(("id" = String, Path, description = "Campaign id")),
    request_body = CampaignStatusBody,
    responses(
        (status = 200, description = "Status changed", body = Campaign),
        (status = 409, description = "Transition not allowed", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn update_campaign_status(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(body): ApiJson<CampaignStatusBody>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.services.crm.update_campaign_status(
        &scope,
        &id,
        body.status,
    )?))
}

#[utoipa::path(
    get,
    path = "/api/campaigns/{id}/stats",
    params(("id" = String, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Lead and conversion figures", body = CampaignStats)
    )
)]
#[axum::debug_handler]
pub async fn campaign_stats(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<CampaignStats>> {
    Ok(Json(state.services.crm.campaign_stats(&scope, &id)?))
}

// ===== LEADS =====

#[utoipa::path(
    get,
    path = "/api/leads",
    params(LeadFilter),
    responses(
        (status = 200, description = "Leads, newest first", body = [Lead])
    )
)]
#[axum::debug_handler]
pub async fn list_leads(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiQuery(filter): ApiQuery<LeadFilter>,
) -> ApiResult<Json<Vec<Lead>>> {
    Ok(Json(state.services.crm.list_leads(&scope, &filter)?))
}

#[utoipa::path(
    post,
    path = "/api/leads",
    request_body = NewLead,
    responses(
        (status = 201, description = "Lead captured", body = Lead)
    )
)]
#[axum::debug_handler]
pub async fn create_lead(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewLead>,
) -> ApiResult<(StatusCode, Json<Lead>)> {
    let lead = state.services.crm.create_lead(&scope, input)?;
    Ok((StatusCode::CREATED, Json(lead)))
}

#[utoipa::path(
    put,
    path = "/api/leads/{id}/status",
    params(("id" = String, Path, description = "Lead id")),
    request_body = LeadStatusBody,
    responses(
        (status = 200, description = "Status changed", body = Lead),
        (status = 400, description = "Use the convert endpoint to convert", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn update_lead_status(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(body): ApiJson<LeadStatusBody>,
) -> ApiResult<Json<Lead>> {
    Ok(Json(
        state.services.crm.update_lead_status(&scope, &id, body.status)?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/leads/{id}/convert",
    params(("id" = String, Path, description = "Lead id")),
    request_body = ConvertLead,
    responses(
        (status = 201, description = "Lead converted into a patient", body = LeadConversion),
        (status = 409, description = "Lead already converted", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn convert_lead(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(input): ApiJson<ConvertLead>,
) -> ApiResult<(StatusCode, Json<LeadConversion>)> {
    let conversion = state.services.crm.convert_lead(&scope, &id, input)?;
    Ok((StatusCode::CREATED, Json(conversion)))
}
