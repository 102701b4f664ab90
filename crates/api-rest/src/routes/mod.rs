//! HTTP routes, one module per area of the clinic.
//!
//! Handlers stay thin: extract the caller's scope, call the matching service and map the
//! result. Status codes come from [`crate::error::ApiError`].

pub mod billing;
pub mod clinical;
pub mod crm;
pub mod employees;
pub mod inventory;
pub mod patients;
pub mod scheduling;
pub mod system;
pub mod visits;

use crate::state::AppState;
use axum::Router;

/// Every route except the Swagger UI.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(system::router())
        .merge(patients::router())
        .merge(scheduling::router())
        .merge(visits::router(max_upload_bytes))
        .merge(clinical::router())
        .merge(billing::router())
        .merge(inventory::router())
        .merge(employees::router())
        .merge(crm::router())
}
