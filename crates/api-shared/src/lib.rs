//! # API Shared
//!
//! Transport-agnostic pieces shared by the clinic APIs.
//!
//! Contains:
//! - `HealthService` and its response type
//! - API-key authentication (`ApiKeyRegistry`, `Principal`, `Role`)
//! - The JSON error envelope and the header names the API uses
//!
//! Used by `api-rest` and the `clinic-run` binary.

pub mod auth;
pub mod envelope;
pub mod health;

pub use auth::{ApiKeyRegistry, AuthError, Principal, Role};
pub use envelope::{
    ErrorEnvelope, API_KEY_HEADER, BRANCH_ID_HEADER, CORRELATION_ID_HEADER, RETRY_AFTER_HEADER,
};
pub use health::{HealthRes, HealthService};
