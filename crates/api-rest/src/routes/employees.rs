use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, Scope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clinic_core::models::{Employee, EmployeeFilter, EmployeeStatus, NewEmployee, Termination};
use clinic_core::RecordId;
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/employees", get(list_employees).post(create_employee))
        .route("/api/employees/:id", get(get_employee))
        .route("/api/employees/:id/status", put(update_employee_status))
        .route("/api/employees/:id/terminate", post(terminate_employee))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EmployeeStatusBody {
    pub status: EmployeeStatus,
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeFilter),
    responses(
        (status = 200, description = "Employees ordered by name", body = [Employee])
    )
)]
#[axum::debug_handler]
pub async fn list_employees(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiQuery(filter): ApiQuery<EmployeeFilter>,
) -> ApiResult<Json<Vec<Employee>>> {
    Ok(Json(state.services.employees.list(&scope, &filter)?))
}

#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = NewEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 409, description = "Email already in use", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn create_employee(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiJson(input): ApiJson<NewEmployee>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    let employee = state.services.employees.create(&scope, input)?;
    Ok((StatusCode::CREATED, Json(employee)))
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id" = String, Path, description = "Employee id")),
    responses(
        (status = 200, description = "The employee", body = Employee)
    )
)]
#[axum::debug_handler]
pub async fn get_employee(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Employee>> {
    Ok(Json(state.services.employees.get(&scope, &id)?))
}

#[utoipa::path(
    put,
    path = "/api/employees/{id}/status",
    params(("id" = String, Path, description = "Employee id")),
    request_body = EmployeeStatusBody,
    responses(
        (status = 200, description = "Status changed", body = Employee),
        (status = 400, description = "Use the terminate endpoint to terminate", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn update_employee_status(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(body): ApiJson<EmployeeStatusBody>,
) -> ApiResult<Json<Employee>> {
    Ok(Json(
        state.services.employees.update_status(&scope, &id, body.status)?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/employees/{id}/terminate",
    params(("id" = String, Path, description = "Employee id")),
    request_body = Termination,
    responses(
        (status = 200, description = "Employee terminated", body = Employee),
        (status = 409, description = "Already terminated", body = api_shared::ErrorEnvelope)
    )
)]
#[axum::debug_handler]
pub async fn terminate_employee(
    State(state): State<AppState>,
    Scope(scope): Scope,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(input): ApiJson<Termination>,
) -> ApiResult<Json<Employee>> {
    Ok(Json(state.services.employees.terminate(&scope, &id, input)?))
}
