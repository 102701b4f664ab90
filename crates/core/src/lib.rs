//! # Clinic Core
//!
//! Core business logic for the multi-tenant clinic record system.
//!
//! This crate contains the domain model and the tenant-scoped services that operate on it:
//! - Patients, appointments, recurring series and the waitlist
//! - Specialty clinical visits with derived metrics, prescriptions and diagnoses
//! - Billing, inventory, HR and CRM
//! - Record storage behind the [`store::Store`] trait (in-memory or sharded YAML files)
//!
//! **No API concerns**: authentication, rate limiting and HTTP routing belong in `api-shared`
//! and `api-rest`.

pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pagination;
pub mod sanitizer;
pub mod services;
pub mod store;
pub mod tenancy;
pub mod validation;

pub use config::{ClinicConfig, Environment, RateLimitConfig, StorageBackend};
pub use error::{ClinicError, ClinicResult, ErrorKind};
pub use pagination::{Page, PageRequest};
pub use services::ClinicServices;
pub use store::{EntityCount, Stores};
pub use tenancy::TenantScope;
pub use validation::{Validate, ValidationErrors};

pub use clinic_types::{EmailAddress, NonEmptyText, PhoneNumber, TenantId};
pub use clinic_uuid::RecordId;
