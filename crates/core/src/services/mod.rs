//! Tenant-scoped clinic operations.
//!
//! Services are cheap to clone: each one holds a [`Stores`] handle (a bundle of `Arc`s) and,
//! where one service builds on another, a clone of that service. Every operation takes the
//! caller's [`TenantScope`] and returns a [`ClinicResult`].
//!
//! ## Write serialisation
//!
//! Check-then-write sequences (uniqueness checks, provider overlap checks, invoice numbering)
//! run while holding [`Stores::write_guard`]. Helpers that must run under the lock take a
//! `&WriteGuard` so that callers composing several steps lock exactly once.

mod appointments;
mod billing;
mod clinical;
mod crm;
mod employees;
mod inventory;
mod patients;
mod recurring;
mod visits;
mod waitlist;

pub use appointments::AppointmentService;
pub use billing::{BillingService, OutstandingBalance};
pub use clinical::{DiagnosisService, PrescriptionService};
pub use crm::{CrmService, LeadConversion};
pub use employees::EmployeeService;
pub use inventory::{InventoryService, MAX_EXPIRY_WINDOW_DAYS};
pub use patients::PatientService;
pub use recurring::{CancelledSeries, RecurringAppointmentService, ScheduledSeries};
pub use visits::ClinicalVisitService;
pub use waitlist::{WaitlistBooking, WaitlistService};

use crate::config::ClinicConfig;
use crate::models::Patient;
use crate::store::Stores;
use crate::{ClinicResult, TenantScope};
use clinic_files::AttachmentStore;
use clinic_uuid::RecordId;

/// Every service, wired to one set of stores.
#[derive(Clone)]
pub struct ClinicServices {
    pub patients: PatientService,
    pub appointments: AppointmentService,
    pub recurring: RecurringAppointmentService,
    pub waitlist: WaitlistService,
    pub visits: ClinicalVisitService,
    pub prescriptions: PrescriptionService,
    pub diagnoses: DiagnosisService,
    pub billing: BillingService,
    pub inventory: InventoryService,
    pub employees: EmployeeService,
    pub crm: CrmService,
    stores: Stores,
}

impl ClinicServices {
    pub fn new(stores: Stores, attachments: AttachmentStore, max_upload_bytes: usize) -> Self {
        let patients = PatientService::new(stores.clone());
        let appointments = AppointmentService::new(stores.clone());
        Self {
            recurring: RecurringAppointmentService::new(stores.clone(), appointments.clone()),
            waitlist: WaitlistService::new(stores.clone(), appointments.clone()),
            visits: ClinicalVisitService::new(stores.clone(), attachments, max_upload_bytes),
            prescriptions: PrescriptionService::new(stores.clone()),
            diagnoses: DiagnosisService::new(stores.clone()),
            billing: BillingService::new(stores.clone()),
            inventory: InventoryService::new(stores.clone()),
            employees: EmployeeService::new(stores.clone()),
            crm: CrmService::new(stores.clone(), patients.clone()),
            patients,
            appointments,
            stores,
        }
    }

    /// Opens the configured storage backend and the attachment store.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError` if the data or attachment directories cannot be created.
    pub fn from_config(cfg: &ClinicConfig) -> ClinicResult<Self> {
        let stores = Stores::from_config(cfg)?;
        let attachments = AttachmentStore::new(&cfg.attachments_dir())?;
        tracing::info!(
            "clinic services ready ({} storage, data dir {})",
            cfg.storage(),
            cfg.data_dir().display()
        );
        Ok(Self::new(stores, attachments, cfg.max_upload_bytes()))
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }
}

/// Loads a patient that a new record is about to reference.
fn require_patient(
    stores: &Stores,
    scope: &TenantScope,
    patient_id: &RecordId,
) -> ClinicResult<Patient> {
    scope.fetch(stores.patients.as_ref(), patient_id)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::{NewPatient, Sex};
    use chrono::NaiveDate;
    use clinic_types::TenantId;
    use tempfile::TempDir;

    pub fn scope() -> TenantScope {
        TenantScope::new(TenantId::new("acme").unwrap())
    }

    pub fn other_scope() -> TenantScope {
        TenantScope::new(TenantId::new("globex").unwrap())
    }

    /// In-memory services with attachments under a fresh temp dir.
    pub fn services() -> (ClinicServices, TempDir) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let attachments = AttachmentStore::new(&temp.path().join("attachments"))
            .expect("Failed to open attachment store");
        (
            ClinicServices::new(Stores::in_memory(), attachments, 1024 * 1024),
            temp,
        )
    }

    pub fn new_patient(first: &str, last: &str) -> NewPatient {
        NewPatient {
            first_name: first.into(),
            last_name: last.into(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 6, 15).unwrap(),
            sex: Sex::Female,
            ..Default::default()
        }
    }

    pub fn patient(services: &ClinicServices, scope: &TenantScope) -> Patient {
        services
            .patients
            .create(scope, new_patient("Grace", "Hopper"))
            .unwrap()
    }
}
