//! Prescriptions and diagnoses.

use super::{clean, earliest_date, notes_field};
use crate::constants::{MAX_NAME_LEN, MAX_SHORT_TEXT_LEN};
use crate::store::Record;
use crate::validation::{Validate, Validator};
use crate::ClinicResult;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::{NonEmptyText, TenantId};
use clinic_uuid::RecordId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// ICD-10 code: letter, two characters, optional dot and up to four more.
static ICD10: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-TV-Z][0-9][0-9A-Z](?:\.[0-9A-Z]{1,4})?$").expect("ICD-10 pattern is valid")
});

/// Upper-cases and validates an ICD-10 code.
pub fn normalize_icd10(code: &str) -> Option<String> {
    let upper = code.trim().to_ascii_uppercase();
    ICD10.is_match(&upper).then_some(upper)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub patient_id: RecordId,
    pub visit_id: Option<RecordId>,
    pub prescriber_id: RecordId,
    pub medication: NonEmptyText,
    pub dosage: NonEmptyText,
    pub frequency: NonEmptyText,
    pub duration_days: u32,
    pub refills: u32,
    pub status: PrescriptionStatus,
    pub instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    /// Last day of the course, counting the prescribing day as day one.
    pub fn ends_on(&self) -> NaiveDate {
        self.created_at.date_naive() + chrono::Duration::days(i64::from(self.duration_days) - 1)
    }
}

impl Record for Prescription {
    const KIND: &'static str = "prescription";

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPrescription {
    pub patient_id: RecordId,
    pub visit_id: Option<RecordId>,
    pub prescriber_id: RecordId,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: u32,
    #[serde(default)]
    pub refills: u32,
    pub instructions: Option<String>,
}

impl NewPrescription {
    fn check(
        &self,
        v: &mut Validator,
    ) -> Option<(NonEmptyText, NonEmptyText, NonEmptyText, Option<String>)> {
        let medication = v.text("medication", &self.medication, MAX_SHORT_TEXT_LEN);
        let dosage = v.text("dosage", &self.dosage, MAX_NAME_LEN);
        let frequency = v.text("frequency", &self.frequency, MAX_NAME_LEN);
        v.range("durationDays", self.duration_days, 1, 365);
        v.range("refills", self.refills, 0, 12);
        let instructions = notes_field(v, "instructions", self.instructions.as_deref());
        Some((medication?, dosage?, frequency?, instructions?))
    }

    pub(crate) fn into_prescription(
        self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> ClinicResult<Prescription> {
        let mut v = Validator::new();
        let parts = self.check(&mut v);
        v.finish_with(|| {
            let (medication, dosage, frequency, instructions) = parts?;
            Some(Prescription {
                id: RecordId::new(),
                tenant_id,
                patient_id: self.patient_id,
                visit_id: self.visit_id,
                prescriber_id: self.prescriber_id,
                medication,
                dosage,
                frequency,
                duration_days: self.duration_days,
                refills: self.refills,
                status: PrescriptionStatus::Active,
                instructions,
                created_at: now,
                updated_at: now,
            })
        })
    }
}

impl Validate for NewPrescription {
    fn collect_errors(&self, v: &mut Validator) {
        let _ = self.check(v);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum DiagnosisStatus {
    Active,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub patient_id: RecordId,
    pub visit_id: Option<RecordId>,
    pub icd10_code: String,
    pub description: String,
    pub is_primary: bool,
    pub status: DiagnosisStatus,
    pub diagnosed_on: NaiveDate,
    pub resolved_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Diagnosis {
    const KIND: &'static str = "diagnosis";

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDiagnosis {
    pub patient_id: RecordId,
    pub visit_id: Option<RecordId>,
    pub icd10_code: String,
    pub description: String,
    #[serde(default)]
    pub is_primary: bool,
    /// Defaults to today
    pub diagnosed_on: Option<NaiveDate>,
}

impl NewDiagnosis {
    fn check(&self, v: &mut Validator, today: NaiveDate) -> Option<(String, NonEmptyText)> {
        let code = normalize_icd10(&self.icd10_code);
        if code.is_none() {
            v.error("icd10Code", "must be a valid ICD-10 code, e.g. H90.3");
        }
        let description = v.text("description", &self.description, MAX_SHORT_TEXT_LEN);
        if let Some(date) = self.diagnosed_on {
            v.date_between("diagnosedOn", date, earliest_date(), today);
        }
        Some((code?, description?))
    }

    pub(crate) fn into_diagnosis(
        self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> ClinicResult<Diagnosis> {
        let today = now.date_naive();
        let mut v = Validator::new();
        let parts = self.check(&mut v, today);
        v.finish_with(|| {
            let (icd10_code, description) = parts?;
            Some(Diagnosis {
                id: RecordId::new(),
                tenant_id,
                patient_id: self.patient_id,
                visit_id: self.visit_id,
                icd10_code,
                description: clean(description.as_str(), MAX_SHORT_TEXT_LEN),
                is_primary: self.is_primary,
                status: DiagnosisStatus::Active,
                diagnosed_on: self.diagnosed_on.unwrap_or(today),
                resolved_on: None,
                created_at: now,
                updated_at: now,
            })
        })
    }
}

impl Validate for NewDiagnosis {
    fn collect_errors(&self, v: &mut Validator) {
        let _ = self.check(v, Utc::now().date_naive());
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDiagnosis {
    /// Defaults to today
    pub resolved_on: Option<NaiveDate>,
}
