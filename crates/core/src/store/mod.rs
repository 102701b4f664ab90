//! Record storage.
//!
//! Services only ever talk to [`Store`]; which backend sits behind it is decided once at
//! startup from [`ClinicConfig`](crate::ClinicConfig).
//!
//! ## Backends
//!
//! - [`MemoryStore`]: process-local map, used for tests and the default `memory` backend
//! - [`YamlStore`]: one `record.yaml` per record in a sharded directory tree
//!
//! ```text
//! clinic_data/
//!   patient/
//!     <s1>/
//!       <s2>/
//!         <id>/
//!           record.yaml
//! ```

mod memory;
mod yaml;

pub use memory::MemoryStore;
pub use yaml::YamlStore;

use crate::config::{ClinicConfig, StorageBackend};
use crate::models::{
    Appointment, Campaign, ClinicalVisit, Diagnosis, Employee, InventoryItem, Invoice, Lead,
    Patient, Prescription, RecurringAppointment, WaitlistEntry,
};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use clinic_types::TenantId;
use clinic_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// A persisted entity.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Entity name, used in error messages and as the YAML directory name.
    const KIND: &'static str;

    fn id(&self) -> RecordId;

    fn tenant_id(&self) -> &TenantId;

    /// Branch for branch-scoped entities.
    fn branch_id(&self) -> Option<RecordId> {
        None
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// Storage for one record type.
///
/// Stores know nothing about tenants or soft deletion; [`TenantScope`](crate::TenantScope)
/// applies those rules on top.
pub trait Store<T: Record>: Send + Sync {
    /// # Errors
    ///
    /// `Conflict` if a record with the same id already exists.
    fn insert(&self, record: T) -> ClinicResult<()>;

    fn get(&self, id: &RecordId) -> ClinicResult<Option<T>>;

    /// # Errors
    ///
    /// `NotFound` if no record with this id exists.
    fn update(&self, record: T) -> ClinicResult<()>;

    /// Every stored record, soft-deleted ones included, ordered by id.
    fn list(&self) -> ClinicResult<Vec<T>>;

    /// Hard delete.
    ///
    /// # Errors
    ///
    /// `NotFound` if no record with this id exists.
    fn remove(&self, id: &RecordId) -> ClinicResult<()>;

    fn count(&self) -> ClinicResult<usize> {
        Ok(self.list()?.len())
    }
}

/// Proof that the caller holds the [`Stores`] write lock.
pub struct WriteGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

/// Per-entity record count for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityCount {
    pub entity: String,
    pub total: usize,
    pub deleted: usize,
}

/// One store per entity plus the lock that serialises check-then-write sequences.
#[derive(Clone)]
pub struct Stores {
    pub patients: Arc<dyn Store<Patient>>,
    pub appointments: Arc<dyn Store<Appointment>>,
    pub recurring: Arc<dyn Store<RecurringAppointment>>,
    pub waitlist: Arc<dyn Store<WaitlistEntry>>,
    pub visits: Arc<dyn Store<ClinicalVisit>>,
    pub prescriptions: Arc<dyn Store<Prescription>>,
    pub diagnoses: Arc<dyn Store<Diagnosis>>,
    pub invoices: Arc<dyn Store<Invoice>>,
    pub inventory: Arc<dyn Store<InventoryItem>>,
    pub employees: Arc<dyn Store<Employee>>,
    pub campaigns: Arc<dyn Store<Campaign>>,
    pub leads: Arc<dyn Store<Lead>>,
    write_lock: Arc<Mutex<()>>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            patients: Arc::new(MemoryStore::new()),
            appointments: Arc::new(MemoryStore::new()),
            recurring: Arc::new(MemoryStore::new()),
            waitlist: Arc::new(MemoryStore::new()),
            visits: Arc::new(MemoryStore::new()),
            prescriptions: Arc::new(MemoryStore::new()),
            diagnoses: Arc::new(MemoryStore::new()),
            invoices: Arc::new(MemoryStore::new()),
            inventory: Arc::new(MemoryStore::new()),
            employees: Arc::new(MemoryStore::new()),
            campaigns: Arc::new(MemoryStore::new()),
            leads: Arc::new(MemoryStore::new()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Opens YAML stores for every entity under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::Io` if an entity directory cannot be created.
    pub fn yaml(data_dir: &Path) -> ClinicResult<Self> {
        Ok(Self {
            patients: Arc::new(YamlStore::open(data_dir)?),
            appointments: Arc::new(YamlStore::open(data_dir)?),
            recurring: Arc::new(YamlStore::open(data_dir)?),
            waitlist: Arc::new(YamlStore::open(data_dir)?),
            visits: Arc::new(YamlStore::open(data_dir)?),
            prescriptions: Arc::new(YamlStore::open(data_dir)?),
            diagnoses: Arc::new(YamlStore::open(data_dir)?),
            invoices: Arc::new(YamlStore::open(data_dir)?),
            inventory: Arc::new(YamlStore::open(data_dir)?),
            employees: Arc::new(YamlStore::open(data_dir)?),
            campaigns: Arc::new(YamlStore::open(data_dir)?),
            leads: Arc::new(YamlStore::open(data_dir)?),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn from_config(cfg: &ClinicConfig) -> ClinicResult<Self> {
        match cfg.storage() {
            StorageBackend::Memory => Ok(Self::in_memory()),
            StorageBackend::Yaml => Self::yaml(cfg.data_dir()),
        }
    }

    /// Serialises uniqueness checks, overlap checks and sequence numbering with their writes.
    ///
    /// The lock is not re-entrant. Helpers that must run under it take a `&WriteGuard` instead
    /// of acquiring it themselves.
    pub fn write_guard(&self) -> ClinicResult<WriteGuard<'_>> {
        self.write_lock
            .lock()
            .map(WriteGuard)
            .map_err(|_| ClinicError::Storage("write lock poisoned".into()))
    }

    /// Record counts for `tenant`, soft-deleted records included and reported separately.
    pub fn tenant_counts(&self, tenant: &TenantId) -> ClinicResult<Vec<EntityCount>> {
        Ok(vec![
            count_for(self.patients.as_ref(), tenant)?,
            count_for(self.appointments.as_ref(), tenant)?,
            count_for(self.recurring.as_ref(), tenant)?,
            count_for(self.waitlist.as_ref(), tenant)?,
            count_for(self.visits.as_ref(), tenant)?,
            count_for(self.prescriptions.as_ref(), tenant)?,
            count_for(self.diagnoses.as_ref(), tenant)?,
            count_for(self.invoices.as_ref(), tenant)?,
            count_for(self.inventory.as_ref(), tenant)?,
            count_for(self.employees.as_ref(), tenant)?,
            count_for(self.campaigns.as_ref(), tenant)?,
            count_for(self.leads.as_ref(), tenant)?,
        ])
    }
}

fn count_for<T: Record>(store: &dyn Store<T>, tenant: &TenantId) -> ClinicResult<EntityCount> {
    let records: Vec<T> = store
        .list()?
        .into_iter()
        .filter(|r| r.tenant_id() == tenant)
        .collect();
    Ok(EntityCount {
        entity: T::KIND.to_string(),
        total: records.len(),
        deleted: records.iter().filter(|r| r.is_deleted()).count(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_counts_report_deleted_separately() {
        use crate::models::{NewPatient, Sex};
        use crate::services::PatientService;
        use crate::TenantScope;

        let stores = Stores::in_memory();
        let service = PatientService::new(stores.clone());
        let scope = TenantScope::new(TenantId::new("acme").unwrap());

        let input = NewPatient {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            date_of_birth: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            sex: Sex::Female,
            ..Default::default()
        };
        let kept = service.create(&scope, input.clone()).unwrap();
        let removed = service.create(&scope, input).unwrap();
        service.delete(&scope, &removed.id).unwrap();
        assert_ne!(kept.id, removed.id);

        let counts = stores.tenant_counts(scope.tenant_id()).unwrap();
        let patients = counts.iter().find(|c| c.entity == "patient").unwrap();
        assert_eq!(patients.total, 2);
        assert_eq!(patients.deleted, 1);

        let other = stores
            .tenant_counts(&TenantId::new("other").unwrap())
            .unwrap();
        assert!(other.iter().all(|c| c.total == 0));
    }
}
