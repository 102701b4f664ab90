//! Clinical visits across specialties, their skin-photo attachments and derived summaries.

use super::require_patient;
use crate::metrics::{summarize, VisitSummary};
use crate::models::{
    ClinicalVisit, NewVisit, Specialty, SpecialtyDetails, VisitFilter, VisitStatus,
};
use crate::store::Stores;
use crate::validation::Validate;
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::Utc;
use clinic_files::{allowed_image_bytes, AttachmentMetadata, AttachmentStore};
use clinic_uuid::RecordId;

#[derive(Clone)]
pub struct ClinicalVisitService {
    stores: Stores,
    attachments: AttachmentStore,
    max_upload_bytes: usize,
}

impl ClinicalVisitService {
    pub fn new(stores: Stores, attachments: AttachmentStore, max_upload_bytes: usize) -> Self {
        Self {
            stores,
            attachments,
            max_upload_bytes,
        }
    }

    /// Opens a visit.
    ///
    /// # Errors
    ///
    /// - `Validation` for bad findings, or an appointment that belongs to another patient
    /// - `NotFound` if the patient or linked appointment does not exist
    pub fn create(&self, scope: &TenantScope, input: NewVisit) -> ClinicResult<ClinicalVisit> {
        let branch_id = scope.resolve_branch(input.branch_id)?;
        require_patient(&self.stores, scope, &input.patient_id)?;
        if let Some(appointment_id) = &input.appointment_id {
            let appointment = scope.fetch(self.stores.appointments.as_ref(), appointment_id)?;
            if appointment.patient_id != input.patient_id {
                return Err(ClinicError::invalid(
                    "appointmentId",
                    "appointment belongs to a different patient",
                ));
            }
        }

        let visit = input.into_visit(scope.tenant_id().clone(), branch_id, Utc::now())?;
        self.stores.visits.insert(visit.clone())?;
        tracing::info!(
            "opened {:?} visit {} for patient {}",
            visit.specialty(),
            visit.id,
            visit.patient_id
        );
        Ok(visit)
    }

    pub fn get(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<ClinicalVisit> {
        scope.fetch(self.stores.visits.as_ref(), id)
    }

    /// Visits matching `filter`, most recent first.
    pub fn list(&self, scope: &TenantScope, filter: &VisitFilter) -> ClinicResult<Vec<ClinicalVisit>> {
        let mut found: Vec<ClinicalVisit> = scope
            .list(self.stores.visits.as_ref())?
            .into_iter()
            .filter(|v| filter.matches(v))
            .collect();
        found.sort_by(|a, b| {
            b.visit_date
                .cmp(&a.visit_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(found)
    }

    pub fn list_by_patient(
        &self,
        scope: &TenantScope,
        patient_id: &RecordId,
    ) -> ClinicResult<Vec<ClinicalVisit>> {
        require_patient(&self.stores, scope, patient_id)?;
        self.list(
            scope,
            &VisitFilter {
                patient_id: Some(*patient_id),
                specialty: None,
            },
        )
    }

    /// Visits in the scope's branch (or the whole tenant without one), optionally narrowed to
    /// one specialty.
    pub fn list_by_branch(
        &self,
        scope: &TenantScope,
        specialty: Option<Specialty>,
    ) -> ClinicResult<Vec<ClinicalVisit>> {
        self.list(
            scope,
            &VisitFilter {
                specialty,
                patient_id: None,
            },
        )
    }

    /// Replaces the findings of an open visit. The specialty cannot change.
    pub fn update_details(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        details: SpecialtyDetails,
    ) -> ClinicResult<ClinicalVisit> {
        details.validate()?;
        let _guard = self.stores.write_guard()?;
        let mut visit = self.get(scope, id)?;
        ensure_open(&visit)?;
        if details.specialty() != visit.specialty() {
            return Err(ClinicError::invalid(
                "details",
                format!(
                    "a {:?} visit cannot record {:?} findings",
                    visit.specialty(),
                    details.specialty()
                ),
            ));
        }
        visit.details = details.sanitized();
        visit.updated_at = Utc::now();
        self.stores.visits.update(visit.clone())?;
        tracing::info!("updated findings for visit {}", id);
        Ok(visit)
    }

    pub fn complete(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<ClinicalVisit> {
        self.close(scope, id, VisitStatus::Completed)
    }

    pub fn cancel(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<ClinicalVisit> {
        self.close(scope, id, VisitStatus::Cancelled)
    }

    fn close(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        status: VisitStatus,
    ) -> ClinicResult<ClinicalVisit> {
        let _guard = self.stores.write_guard()?;
        let mut visit = self.get(scope, id)?;
        ensure_open(&visit)?;
        let now = Utc::now();
        visit.status = status;
        if status == VisitStatus::Completed {
            visit.completed_at = Some(now);
        }
        visit.updated_at = now;
        self.stores.visits.update(visit.clone())?;
        tracing::info!("visit {} is now {:?}", id, status);
        Ok(visit)
    }

    /// Stores a skin photo against a dermatology visit.
    ///
    /// Uploading the same photo twice is idempotent.
    ///
    /// # Errors
    ///
    /// - `PayloadTooLarge` if the upload exceeds the configured limit
    /// - `Validation` if the visit is not dermatology or the bytes are not a JPEG, PNG, WebP
    ///   or HEIC image
    /// - `Conflict` if the visit is cancelled
    pub fn add_attachment(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        filename: &str,
        bytes: &[u8],
    ) -> ClinicResult<AttachmentMetadata> {
        if bytes.len() > self.max_upload_bytes {
            return Err(ClinicError::PayloadTooLarge(format!(
                "photo must not exceed {} bytes",
                self.max_upload_bytes
            )));
        }
        if !allowed_image_bytes(bytes) {
            return Err(ClinicError::invalid(
                "photo",
                "must be a JPEG, PNG, WebP or HEIC image",
            ));
        }

        let _guard = self.stores.write_guard()?;
        let mut visit = self.get(scope, id)?;
        if visit.specialty() != Specialty::Dermatology {
            return Err(ClinicError::invalid(
                "photo",
                "photos can only be attached to dermatology visits",
            ));
        }
        if visit.status == VisitStatus::Cancelled {
            return Err(ClinicError::Conflict(
                "cannot attach photos to a cancelled visit".into(),
            ));
        }

        let metadata = self.attachments.add(&visit.id, filename, bytes)?;
        if !visit.attachments.iter().any(|a| a.hash == metadata.hash) {
            visit.attachments.push(metadata.clone());
            visit.updated_at = Utc::now();
            self.stores.visits.update(visit)?;
            tracing::info!("attached photo {} to visit {}", metadata.hash, id);
        }
        Ok(metadata)
    }

    /// Returns an attachment's metadata and bytes.
    pub fn read_attachment(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        hash: &str,
    ) -> ClinicResult<(AttachmentMetadata, Vec<u8>)> {
        let visit = self.get(scope, id)?;
        let metadata = visit
            .attachments
            .iter()
            .find(|a| a.hash.as_str() == hash)
            .cloned()
            .ok_or_else(|| ClinicError::not_found("attachment", hash))?;
        let bytes = self.attachments.read(&visit.id, hash)?;
        Ok((metadata, bytes))
    }

    pub fn summary(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<VisitSummary> {
        Ok(summarize(&self.get(scope, id)?))
    }
}

fn ensure_open(visit: &ClinicalVisit) -> ClinicResult<()> {
    if visit.status != VisitStatus::Open {
        return Err(ClinicError::Conflict(format!(
            "visit {} is {:?}",
            visit.id, visit.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SpecialtyMetrics;
    use crate::models::{
        AudiogramPoint, AudiologyDetails, CardiologyDetails, DermatologyDetails, Ear, Lesion,
    };
    use crate::services::test_support::{patient, scope, services};
    use chrono::NaiveDate;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn visit_input(patient_id: RecordId, details: SpecialtyDetails) -> NewVisit {
        NewVisit {
            branch_id: None,
            patient_id,
            provider_id: RecordId::new(),
            appointment_id: None,
            visit_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            chief_complaint: Some("follow-up".into()),
            notes: None,
            details,
        }
    }

    fn audiology() -> SpecialtyDetails {
        let point = |ear, frequency_hz, threshold_db| AudiogramPoint {
            ear,
            frequency_hz,
            threshold_db,
        };
        SpecialtyDetails::Audiology(AudiologyDetails {
            audiogram: vec![
                point(Ear::Left, 500, 30),
                point(Ear::Left, 1000, 40),
                point(Ear::Left, 2000, 50),
            ],
            tympanogram_left: None,
            tympanogram_right: None,
            hearing_aid_recommended: true,
        })
    }

    fn dermatology() -> SpecialtyDetails {
        SpecialtyDetails::Dermatology(DermatologyDetails {
            lesions: vec![Lesion {
                body_site: "left forearm".into(),
                morphology: "papule".into(),
                size_mm: 4.0,
            }],
        })
    }

    fn cardiology() -> SpecialtyDetails {
        SpecialtyDetails::Cardiology(CardiologyDetails {
            systolic: 128,
            diastolic: 82,
            heart_rate: 70,
            ecg_rhythm: Some("sinus".into()),
            ejection_fraction: None,
        })
    }

    #[test]
    fn summary_reports_pure_tone_average() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let p = patient(&services, &scope);
        let visit = services
            .visits
            .create(&scope, visit_input(p.id, audiology()))
            .unwrap();

        let summary = services.visits.summary(&scope, &visit.id).unwrap();
        match summary.metrics {
            SpecialtyMetrics::Audiology { left, .. } => {
                assert_eq!(left.pta_db, Some(40.0));
            }
            other => panic!("unexpected metrics {other:?}"),
        }
    }

    #[test]
    fn lists_by_branch_and_specialty() {
        let (services, _temp) = services();
        let branch = RecordId::new();
        let scope = scope().with_branch(branch);
        let p = patient(&services, &scope);
        services
            .visits
            .create(&scope, visit_input(p.id, audiology()))
            .unwrap();
        services
            .visits
            .create(&scope, visit_input(p.id, cardiology()))
            .unwrap();
        let elsewhere = crate::services::test_support::scope().with_branch(RecordId::new());
        services
            .visits
            .create(&elsewhere, visit_input(p.id, cardiology()))
            .unwrap();

        assert_eq!(
            services
                .visits
                .list_by_branch(&scope, Some(Specialty::Cardiology))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(services.visits.list_by_branch(&scope, None).unwrap().len(), 2);
        assert_eq!(
            services
                .visits
                .list_by_patient(&crate::services::test_support::scope(), &p.id)
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn details_only_change_while_open_and_keep_specialty() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let p = patient(&services, &scope);
        let visit = services
            .visits
            .create(&scope, visit_input(p.id, cardiology()))
            .unwrap();

        let err = services
            .visits
            .update_details(&scope, &visit.id, audiology())
            .unwrap_err();
        assert!(err.field_errors().unwrap().get("details").is_some());

        services.visits.complete(&scope, &visit.id).unwrap();
        let err = services
            .visits
            .update_details(&scope, &visit.id, cardiology())
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
        assert!(matches!(
            services.visits.cancel(&scope, &visit.id),
            Err(ClinicError::Conflict(_))
        ));
    }

    #[test]
    fn photos_only_for_dermatology() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let p = patient(&services, &scope);
        let derm = services
            .visits
            .create(&scope, visit_input(p.id, dermatology()))
            .unwrap();
        let cardio = services
            .visits
            .create(&scope, visit_input(p.id, cardiology()))
            .unwrap();

        let meta = services
            .visits
            .add_attachment(&scope, &derm.id, "forearm.png", PNG)
            .unwrap();
        services
            .visits
            .add_attachment(&scope, &derm.id, "again.png", PNG)
            .unwrap();
        assert_eq!(services.visits.get(&scope, &derm.id).unwrap().attachments.len(), 1);

        let (stored, bytes) = services
            .visits
            .read_attachment(&scope, &derm.id, meta.hash.as_str())
            .unwrap();
        assert_eq!(stored.hash, meta.hash);
        assert_eq!(bytes, PNG);

        assert!(services
            .visits
            .add_attachment(&scope, &cardio.id, "x.png", PNG)
            .is_err());
        assert!(services
            .visits
            .add_attachment(&scope, &derm.id, "notes.txt", b"not an image")
            .is_err());
        assert!(matches!(
            services
                .visits
                .read_attachment(&scope, &cardio.id, meta.hash.as_str()),
            Err(ClinicError::NotFound { .. })
        ));
    }

    #[test]
    fn rejects_oversized_upload() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let p = patient(&services, &scope);
        let derm = services
            .visits
            .create(&scope, visit_input(p.id, dermatology()))
            .unwrap();
        let mut big = PNG.to_vec();
        big.resize(2 * 1024 * 1024, 0);

        let err = services
            .visits
            .add_attachment(&scope, &derm.id, "huge.png", &big)
            .unwrap_err();
        assert!(matches!(err, ClinicError::PayloadTooLarge(_)));
        assert_eq!(err.kind(), crate::ErrorKind::PayloadTooLarge);
    }
}
