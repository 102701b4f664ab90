//! Patient registration, search and soft deletion.

use crate::models::{NewPatient, Patient, UpdatePatient};
use crate::pagination::{Page, PageRequest};
use crate::sanitizer::normalize_search_query;
use crate::store::{Stores, WriteGuard};
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::Utc;
use clinic_uuid::RecordId;

#[derive(Clone)]
pub struct PatientService {
    stores: Stores,
}

impl PatientService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Registers a new patient.
    ///
    /// # Errors
    ///
    /// - `Validation` if any field is invalid
    /// - `Conflict` if another patient in the tenant has the same national id
    pub fn create(&self, scope: &TenantScope, input: NewPatient) -> ClinicResult<Patient> {
        let patient = input.into_patient(scope.tenant_id().clone(), Utc::now())?;
        let guard = self.stores.write_guard()?;
        self.insert_locked(&guard, scope, patient)
    }

    /// Inserts an already validated patient. Used by lead conversion, which holds the lock
    /// across both the patient insert and the lead update.
    pub(crate) fn insert_locked(
        &self,
        _guard: &WriteGuard<'_>,
        scope: &TenantScope,
        patient: Patient,
    ) -> ClinicResult<Patient> {
        self.ensure_unique_national_id(scope, &patient)?;
        self.stores.patients.insert(patient.clone())?;
        tracing::info!(
            "registered patient {} for tenant {}",
            patient.id,
            scope.tenant_id()
        );
        Ok(patient)
    }

    pub fn get(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<Patient> {
        scope.fetch(self.stores.patients.as_ref(), id)
    }

    /// Applies a partial update.
    pub fn update(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        input: UpdatePatient,
    ) -> ClinicResult<Patient> {
        let _guard = self.stores.write_guard()?;
        let existing = self.get(scope, id)?;
        let updated = input.apply(&existing, Utc::now())?;
        self.ensure_unique_national_id(scope, &updated)?;
        self.stores.patients.update(updated.clone())?;
        tracing::info!("updated patient {}", id);
        Ok(updated)
    }

    /// Soft delete: the record is kept but disappears from reads and lists.
    pub fn delete(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<()> {
        let _guard = self.stores.write_guard()?;
        let mut patient = self.get(scope, id)?;
        let now = Utc::now();
        patient.deleted_at = Some(now);
        patient.updated_at = now;
        self.stores.patients.update(patient)?;
        tracing::info!("soft-deleted patient {}", id);
        Ok(())
    }

    /// Case-insensitive search over names, email, phone and national id, ordered by last then
    /// first name. An empty query lists every patient.
    pub fn search(
        &self,
        scope: &TenantScope,
        query: &str,
        page: &PageRequest,
    ) -> ClinicResult<Page<Patient>> {
        let needle = normalize_search_query(query).to_lowercase();
        let mut found: Vec<Patient> = scope
            .list(self.stores.patients.as_ref())?
            .into_iter()
            .filter(|p| p.matches(&needle))
            .collect();
        found.sort_by_cached_key(|p| {
            (
                p.last_name.as_str().to_lowercase(),
                p.first_name.as_str().to_lowercase(),
                p.id,
            )
        });
        Ok(Page::from_vec(found, page))
    }

    fn ensure_unique_national_id(&self, scope: &TenantScope, patient: &Patient) -> ClinicResult<()> {
        let Some(national_id) = &patient.national_id else {
            return Ok(());
        };
        let taken = scope
            .list(self.stores.patients.as_ref())?
            .iter()
            .any(|p| p.id != patient.id && p.national_id.as_ref() == Some(national_id));
        if taken {
            return Err(ClinicError::Conflict(
                "national id is already registered to another patient".into(),
            ));
        }
        Ok(())
    }
}
