//! Prescriptions and diagnoses.

use super::require_patient;
use crate::models::{
    Diagnosis, DiagnosisStatus, NewDiagnosis, NewPrescription, Prescription, PrescriptionStatus,
    ResolveDiagnosis,
};
use crate::store::Stores;
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::Utc;
use clinic_uuid::RecordId;

/// Checks that a linked visit exists in the tenant and belongs to `patient_id`.
fn check_visit_link(
    stores: &Stores,
    scope: &TenantScope,
    visit_id: Option<&RecordId>,
    patient_id: &RecordId,
) -> ClinicResult<()> {
    let Some(visit_id) = visit_id else {
        return Ok(());
    };
    let visit = scope.fetch(stores.visits.as_ref(), visit_id)?;
    if &visit.patient_id != patient_id {
        return Err(ClinicError::invalid(
            "visitId",
            "visit belongs to a different patient",
        ));
    }
    Ok(())
}

// ============================================================================
// PRESCRIPTIONS
// ============================================================================

#[derive(Clone)]
pub struct PrescriptionService {
    stores: Stores,
}

impl PrescriptionService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub fn create(&self, scope: &TenantScope, input: NewPrescription) -> ClinicResult<Prescription> {
        require_patient(&self.stores, scope, &input.patient_id)?;
        check_visit_link(&self.stores, scope, input.visit_id.as_ref(), &input.patient_id)?;
        let prescription = input.into_prescription(scope.tenant_id().clone(), Utc::now())?;
        self.stores.prescriptions.insert(prescription.clone())?;
        tracing::info!(
            "prescribed {} for patient {}",
            prescription.medication,
            prescription.patient_id
        );
        Ok(prescription)
    }

    pub fn get(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<Prescription> {
        scope.fetch(self.stores.prescriptions.as_ref(), id)
    }

    /// A patient's prescriptions, newest first.
    pub fn list_for_patient(
        &self,
        scope: &TenantScope,
        patient_id: &RecordId,
        active_only: bool,
    ) -> ClinicResult<Vec<Prescription>> {
        require_patient(&self.stores, scope, patient_id)?;
        let mut found: Vec<Prescription> = scope
            .list(self.stores.prescriptions.as_ref())?
            .into_iter()
            .filter(|p| &p.patient_id == patient_id)
            .filter(|p| !active_only || p.status == PrescriptionStatus::Active)
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    /// Ends an active prescription. Completed, Cancelled and Expired are final.
    pub fn update_status(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        status: PrescriptionStatus,
    ) -> ClinicResult<Prescription> {
        let _guard = self.stores.write_guard()?;
        let mut prescription = self.get(scope, id)?;
        if prescription.status != PrescriptionStatus::Active || status == PrescriptionStatus::Active
        {
            return Err(ClinicError::Conflict(format!(
                "prescription cannot move from {:?} to {:?}",
                prescription.status, status
            )));
        }
        prescription.status = status;
        prescription.updated_at = Utc::now();
        self.stores.prescriptions.update(prescription.clone())?;
        tracing::info!("prescription {} is now {:?}", id, status);
        Ok(prescription)
    }
}

// ============================================================================
// DIAGNOSES
// ============================================================================

#[derive(Clone)]
pub struct DiagnosisService {
    stores: Stores,
}

impl DiagnosisService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Records a diagnosis. A new primary diagnosis for a visit demotes the previous one.
    pub fn create(&self, scope: &TenantScope, input: NewDiagnosis) -> ClinicResult<Diagnosis> {
        require_patient(&self.stores, scope, &input.patient_id)?;
        check_visit_link(&self.stores, scope, input.visit_id.as_ref(), &input.patient_id)?;
        let diagnosis = input.into_diagnosis(scope.tenant_id().clone(), Utc::now())?;

        let _guard = self.stores.write_guard()?;
        if let (true, Some(visit_id)) = (diagnosis.is_primary, diagnosis.visit_id) {
            for mut previous in scope.list(self.stores.diagnoses.as_ref())? {
                if previous.visit_id == Some(visit_id) && previous.is_primary {
                    previous.is_primary = false;
                    previous.updated_at = diagnosis.created_at;
                    self.stores.diagnoses.update(previous.clone())?;
                    tracing::info!(
                        "diagnosis {} is no longer primary for visit {}",
                        previous.id,
                        visit_id
                    );
                }
            }
        }
        self.stores.diagnoses.insert(diagnosis.clone())?;
        tracing::info!(
            "recorded diagnosis {} ({}) for patient {}",
            diagnosis.id,
            diagnosis.icd10_code,
            diagnosis.patient_id
        );
        Ok(diagnosis)
    }

    /// A patient's diagnoses, most recently diagnosed first.
    pub fn list_for_patient(
        &self,
        scope: &TenantScope,
        patient_id: &RecordId,
    ) -> ClinicResult<Vec<Diagnosis>> {
        require_patient(&self.stores, scope, patient_id)?;
        let mut found: Vec<Diagnosis> = scope
            .list(self.stores.diagnoses.as_ref())?
            .into_iter()
            .filter(|d| &d.patient_id == patient_id)
            .collect();
        found.sort_by(|a, b| {
            b.diagnosed_on
                .cmp(&a.diagnosed_on)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(found)
    }

    pub fn resolve(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        input: ResolveDiagnosis,
    ) -> ClinicResult<Diagnosis> {
        let _guard = self.stores.write_guard()?;
        let mut diagnosis = scope.fetch(self.stores.diagnoses.as_ref(), id)?;
        if diagnosis.status != DiagnosisStatus::Active {
            return Err(ClinicError::Conflict(format!(
                "diagnosis {id} is already resolved"
            )));
        }

        let now = Utc::now();
        let today = now.date_naive();
        let resolved_on = input.resolved_on.unwrap_or(today);
        if resolved_on < diagnosis.diagnosed_on || resolved_on > today {
            return Err(ClinicError::invalid(
                "resolvedOn",
                format!(
                    "must be between {} and {}",
                    diagnosis.diagnosed_on, today
                ),
            ));
        }

        diagnosis.status = DiagnosisStatus::Resolved;
        diagnosis.resolved_on = Some(resolved_on);
        diagnosis.updated_at = now;
        self.stores.diagnoses.update(diagnosis.clone())?;
        tracing::info!("resolved diagnosis {}", id);
        Ok(diagnosis)
    }
}
