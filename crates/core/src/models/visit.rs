//! Clinical visits and their specialty-specific details.
//!
//! A visit is a single encounter. The shared fields (who, where, when, status) live on
//! [`ClinicalVisit`]; everything a specialty records lives in exactly one
//! [`SpecialtyDetails`] variant, so a dental visit can never carry an audiogram.

use super::{clean, earliest_date, notes_field};
use crate::constants::{MAX_NAME_LEN, MAX_NOTES_LEN, MAX_SHORT_TEXT_LEN};
use crate::store::Record;
use crate::validation::{Validate, Validator};
use crate::ClinicResult;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_files::AttachmentMetadata;
use clinic_types::TenantId;
use clinic_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Audiogram test frequencies in Hz.
pub const AUDIOGRAM_FREQUENCIES: [u32; 8] = [250, 500, 1000, 2000, 3000, 4000, 6000, 8000];

const MAX_LIST_ITEMS: usize = 64;
const DENTAL_SURFACES: &str = "MODBLIF";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    Audiology,
    Dermatology,
    Neurology,
    Cardiology,
    Dental,
    Ophthalmology,
    Physiotherapy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum VisitStatus {
    Open,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Ear {
    Left,
    Right,
}

// ============================================================================
// SPECIALTY DETAILS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudiogramPoint {
    pub ear: Ear,
    pub frequency_hz: u32,
    /// Hearing threshold in dB HL
    pub threshold_db: i32,
}

/// Jerger tympanogram classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum TympanogramType {
    A,
    As,
    Ad,
    B,
    C,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudiologyDetails {
    #[serde(default)]
    pub audiogram: Vec<AudiogramPoint>,
    pub tympanogram_left: Option<TympanogramType>,
    pub tympanogram_right: Option<TympanogramType>,
    #[serde(default)]
    pub hearing_aid_recommended: bool,
}

impl Validate for AudiologyDetails {
    fn collect_errors(&self, v: &mut Validator) {
        v.check(
            self.audiogram.len() <= MAX_LIST_ITEMS,
            "audiogram",
            format!("at most {MAX_LIST_ITEMS} points"),
        );
        let mut seen = HashSet::new();
        for (i, point) in self.audiogram.iter().enumerate() {
            v.check(
                AUDIOGRAM_FREQUENCIES.contains(&point.frequency_hz),
                &format!("audiogram[{i}].frequencyHz"),
                "must be a standard audiometric frequency",
            );
            v.range(
                &format!("audiogram[{i}].thresholdDb"),
                point.threshold_db,
                -10,
                120,
            );
            v.check(
                seen.insert((point.ear, point.frequency_hz)),
                &format!("audiogram[{i}]"),
                "duplicate ear and frequency",
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lesion {
    pub body_site: String,
    pub morphology: String,
    pub size_mm: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DermatologyDetails {
    #[serde(default)]
    pub lesions: Vec<Lesion>,
}

impl Validate for DermatologyDetails {
    fn collect_errors(&self, v: &mut Validator) {
        v.check(
            self.lesions.len() <= MAX_LIST_ITEMS,
            "lesions",
            format!("at most {MAX_LIST_ITEMS} lesions"),
        );
        for (i, lesion) in self.lesions.iter().enumerate() {
            v.text(&format!("lesions[{i}].bodySite"), &lesion.body_site, MAX_NAME_LEN);
            v.text(
                &format!("lesions[{i}].morphology"),
                &lesion.morphology,
                MAX_NAME_LEN,
            );
            v.check(
                lesion.size_mm.is_finite(),
                &format!("lesions[{i}].sizeMm"),
                "must be a number",
            );
            v.range(&format!("lesions[{i}].sizeMm"), lesion.size_mm, 0.1, 500.0);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EegResult {
    pub duration_minutes: u32,
    pub findings: String,
    pub abnormal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NeurologyDetails {
    pub eeg: Option<EegResult>,
    /// Glasgow Coma Scale, 3-15
    pub gcs_score: Option<u8>,
    pub reflex_notes: Option<String>,
}

impl Validate for NeurologyDetails {
    fn collect_errors(&self, v: &mut Validator) {
        if let Some(eeg) = &self.eeg {
            v.range("eeg.durationMinutes", eeg.duration_minutes, 1, 1440);
            v.text("eeg.findings", &eeg.findings, MAX_NOTES_LEN);
        }
        if let Some(gcs) = self.gcs_score {
            v.range("gcsScore", gcs, 3, 15);
        }
        v.optional_text("reflexNotes", self.reflex_notes.as_deref(), MAX_NOTES_LEN);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardiologyDetails {
    /// mmHg
    pub systolic: u16,
    /// mmHg
    pub diastolic: u16,
    /// Beats per minute
    pub heart_rate: u16,
    pub ecg_rhythm: Option<String>,
    /// Left ventricular ejection fraction, percent
    pub ejection_fraction: Option<u8>,
}

impl Validate for CardiologyDetails {
    fn collect_errors(&self, v: &mut Validator) {
        v.range("systolic", self.systolic, 50, 300);
        v.range("diastolic", self.diastolic, 30, 200);
        v.check(
            self.diastolic < self.systolic,
            "diastolic",
            "must be lower than systolic",
        );
        v.range("heartRate", self.heart_rate, 20, 300);
        v.optional_text("ecgRhythm", self.ecg_rhythm.as_deref(), MAX_NAME_LEN);
        if let Some(ef) = self.ejection_fraction {
            v.range("ejectionFraction", ef, 0, 100);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DentalProcedure {
    /// FDI two-digit tooth number
    pub tooth: u8,
    pub procedure: String,
    /// Surfaces as letters from `MODBLIF`
    pub surface: Option<String>,
}

/// True for permanent-dentition FDI numbers: quadrants 1-4, teeth 1-8.
pub fn is_valid_fdi_tooth(tooth: u8) -> bool {
    let quadrant = tooth / 10;
    let position = tooth % 10;
    (1..=4).contains(&quadrant) && (1..=8).contains(&position)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DentalDetails {
    #[serde(default)]
    pub procedures: Vec<DentalProcedure>,
    /// 0 (poor) to 10 (excellent)
    pub oral_hygiene_score: Option<u8>,
}

impl Validate for DentalDetails {
    fn collect_errors(&self, v: &mut Validator) {
        v.check(
            self.procedures.len() <= MAX_LIST_ITEMS,
            "procedures",
            format!("at most {MAX_LIST_ITEMS} procedures"),
        );
        for (i, p) in self.procedures.iter().enumerate() {
            v.check(
                is_valid_fdi_tooth(p.tooth),
                &format!("procedures[{i}].tooth"),
                "must be an FDI tooth number (11-18, 21-28, 31-38, 41-48)",
            );
            v.text(
                &format!("procedures[{i}].procedure"),
                &p.procedure,
                MAX_SHORT_TEXT_LEN,
            );
            if let Some(surface) = p.surface.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                let upper = surface.to_ascii_uppercase();
                v.check(
                    upper.len() <= DENTAL_SURFACES.len()
                        && upper.chars().all(|c| DENTAL_SURFACES.contains(c)),
                    &format!("procedures[{i}].surface"),
                    "must use surface letters M, O, D, B, L, I, F",
                );
            }
        }
        if let Some(score) = self.oral_hygiene_score {
            v.range("oralHygieneScore", score, 0, 10);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OphthalmologyDetails {
    /// Snellen denominator for 6/x, right eye
    pub visual_acuity_right: Option<u16>,
    /// Snellen denominator for 6/x, left eye
    pub visual_acuity_left: Option<u16>,
    /// Intraocular pressure in mmHg
    pub iop_right: Option<f64>,
    pub iop_left: Option<f64>,
}

impl Validate for OphthalmologyDetails {
    fn collect_errors(&self, v: &mut Validator) {
        if let Some(va) = self.visual_acuity_right {
            v.range("visualAcuityRight", va, 1, 600);
        }
        if let Some(va) = self.visual_acuity_left {
            v.range("visualAcuityLeft", va, 1, 600);
        }
        if let Some(iop) = self.iop_right {
            v.range("iopRight", iop, 0.0, 80.0);
        }
        if let Some(iop) = self.iop_left {
            v.range("iopLeft", iop, 0.0, 80.0);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhysiotherapyDetails {
    pub session_number: u32,
    pub pain_before: u8,
    pub pain_after: u8,
    #[serde(default)]
    pub exercises: Vec<String>,
    pub range_of_motion_notes: Option<String>,
}

impl Validate for PhysiotherapyDetails {
    fn collect_errors(&self, v: &mut Validator) {
        v.range("sessionNumber", self.session_number, 1, 1000);
        v.range("painBefore", self.pain_before, 0, 10);
        v.range("painAfter", self.pain_after, 0, 10);
        v.check(
            self.exercises.len() <= MAX_LIST_ITEMS,
            "exercises",
            format!("at most {MAX_LIST_ITEMS} exercises"),
        );
        for (i, exercise) in self.exercises.iter().enumerate() {
            v.text(&format!("exercises[{i}]"), exercise, MAX_SHORT_TEXT_LEN);
        }
        v.optional_text(
            "rangeOfMotionNotes",
            self.range_of_motion_notes.as_deref(),
            MAX_NOTES_LEN,
        );
    }
}

/// Specialty-specific findings. Serialised externally tagged, e.g. `{"dental": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpecialtyDetails {
    Audiology(AudiologyDetails),
    Dermatology(DermatologyDetails),
    Neurology(NeurologyDetails),
    Cardiology(CardiologyDetails),
    Dental(DentalDetails),
    Ophthalmology(OphthalmologyDetails),
    Physiotherapy(PhysiotherapyDetails),
}

impl SpecialtyDetails {
    pub fn specialty(&self) -> Specialty {
        match self {
            SpecialtyDetails::Audiology(_) => Specialty::Audiology,
            SpecialtyDetails::Dermatology(_) => Specialty::Dermatology,
            SpecialtyDetails::Neurology(_) => Specialty::Neurology,
            SpecialtyDetails::Cardiology(_) => Specialty::Cardiology,
            SpecialtyDetails::Dental(_) => Specialty::Dental,
            SpecialtyDetails::Ophthalmology(_) => Specialty::Ophthalmology,
            SpecialtyDetails::Physiotherapy(_) => Specialty::Physiotherapy,
        }
    }

    /// Sanitises every free-text field. Call after validation.
    pub(crate) fn sanitized(self) -> Self {
        let opt = |s: Option<String>, max: usize| {
            s.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(|s| clean(&s, max))
        };
        match self {
            SpecialtyDetails::Dermatology(mut d) => {
                for lesion in &mut d.lesions {
                    lesion.body_site = clean(&lesion.body_site, MAX_NAME_LEN);
                    lesion.morphology = clean(&lesion.morphology, MAX_NAME_LEN);
                }
                SpecialtyDetails::Dermatology(d)
            }
            SpecialtyDetails::Neurology(mut n) => {
                if let Some(eeg) = &mut n.eeg {
                    eeg.findings = clean(&eeg.findings, MAX_NOTES_LEN);
                }
                n.reflex_notes = opt(n.reflex_notes, MAX_NOTES_LEN);
                SpecialtyDetails::Neurology(n)
            }
            SpecialtyDetails::Cardiology(mut c) => {
                c.ecg_rhythm = opt(c.ecg_rhythm, MAX_NAME_LEN);
                SpecialtyDetails::Cardiology(c)
            }
            SpecialtyDetails::Dental(mut d) => {
                for p in &mut d.procedures {
                    p.procedure = clean(&p.procedure, MAX_SHORT_TEXT_LEN);
                    p.surface = p
                        .surface
                        .take()
                        .map(|s| s.trim().to_ascii_uppercase())
                        .filter(|s| !s.is_empty());
                }
                SpecialtyDetails::Dental(d)
            }
            SpecialtyDetails::Physiotherapy(mut p) => {
                p.exercises = p
                    .exercises
                    .iter()
                    .map(|e| clean(e, MAX_SHORT_TEXT_LEN))
                    .collect();
                p.range_of_motion_notes = opt(p.range_of_motion_notes, MAX_NOTES_LEN);
                SpecialtyDetails::Physiotherapy(p)
            }
            other @ (SpecialtyDetails::Audiology(_) | SpecialtyDetails::Ophthalmology(_)) => {
                other
            }
        }
    }
}

impl Validate for SpecialtyDetails {
    fn collect_errors(&self, v: &mut Validator) {
        match self {
            SpecialtyDetails::Audiology(d) => v.nested("details", d),
            SpecialtyDetails::Dermatology(d) => v.nested("details", d),
            SpecialtyDetails::Neurology(d) => v.nested("details", d),
            SpecialtyDetails::Cardiology(d) => v.nested("details", d),
            SpecialtyDetails::Dental(d) => v.nested("details", d),
            SpecialtyDetails::Ophthalmology(d) => v.nested("details", d),
            SpecialtyDetails::Physiotherapy(d) => v.nested("details", d),
        }
    }
}

// ============================================================================
// VISIT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalVisit {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub branch_id: RecordId,
    pub patient_id: RecordId,
    pub provider_id: RecordId,
    pub appointment_id: Option<RecordId>,
    pub visit_date: NaiveDate,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
    pub status: VisitStatus,
    pub details: SpecialtyDetails,
    #[serde(default)]
    pub attachments: Vec<AttachmentMetadata>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClinicalVisit {
    pub fn specialty(&self) -> Specialty {
        self.details.specialty()
    }
}

impl Record for ClinicalVisit {
    const KIND: &'static str = "clinical_visit";

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    fn branch_id(&self) -> Option<RecordId> {
        Some(self.branch_id)
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    pub branch_id: Option<RecordId>,
    pub patient_id: RecordId,
    pub provider_id: RecordId,
    pub appointment_id: Option<RecordId>,
    pub visit_date: NaiveDate,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
    pub details: SpecialtyDetails,
}

fn check_visit_date(v: &mut Validator, date: NaiveDate) {
    let latest = Utc::now().date_naive() + chrono::Duration::days(365);
    v.date_between("visitDate", date, earliest_date(), latest);
}

impl Validate for NewVisit {
    fn collect_errors(&self, v: &mut Validator) {
        check_visit_date(v, self.visit_date);
        v.optional_text(
            "chiefComplaint",
            self.chief_complaint.as_deref(),
            MAX_SHORT_TEXT_LEN,
        );
        notes_field(v, "notes", self.notes.as_deref());
        self.details.collect_errors(v);
    }
}

impl NewVisit {
    pub(crate) fn into_visit(
        self,
        tenant_id: TenantId,
        branch_id: RecordId,
        now: DateTime<Utc>,
    ) -> ClinicResult<ClinicalVisit> {
        let mut v = Validator::new();
        check_visit_date(&mut v, self.visit_date);
        let complaint = v.optional_text(
            "chiefComplaint",
            self.chief_complaint.as_deref(),
            MAX_SHORT_TEXT_LEN,
        );
        let notes = notes_field(&mut v, "notes", self.notes.as_deref());
        self.details.collect_errors(&mut v);

        v.finish_with(|| {
            Some(ClinicalVisit {
                id: RecordId::new(),
                tenant_id,
                branch_id,
                patient_id: self.patient_id,
                provider_id: self.provider_id,
                appointment_id: self.appointment_id,
                visit_date: self.visit_date,
                chief_complaint: complaint?.map(|c| clean(c.as_str(), MAX_SHORT_TEXT_LEN)),
                notes: notes?,
                status: VisitStatus::Open,
                details: self.details.sanitized(),
                attachments: Vec::new(),
                completed_at: None,
                created_at: now,
                updated_at: now,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct VisitFilter {
    #[param(value_type = Option<String>)]
    pub specialty: Option<Specialty>,
    #[param(value_type = Option<String>)]
    pub patient_id: Option<RecordId>,
}

impl VisitFilter {
    pub fn matches(&self, visit: &ClinicalVisit) -> bool {
        self.specialty.map_or(true, |s| visit.specialty() == s)
            && self.patient_id.map_or(true, |p| visit.patient_id == p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cardiology(systolic: u16, diastolic: u16) -> SpecialtyDetails {
        SpecialtyDetails::Cardiology(CardiologyDetails {
            systolic,
            diastolic,
            heart_rate: 72,
            ecg_rhythm: Some("sinus".into()),
            ejection_fraction: Some(60),
        })
    }

    #[test]
    fn details_serialize_externally_tagged() {
        let json = serde_json::to_value(cardiology(120, 80)).unwrap();
        assert_eq!(json["cardiology"]["systolic"], 120);
        assert_eq!(json["cardiology"]["heartRate"], 72);

        let parsed: SpecialtyDetails = serde_json::from_value(serde_json::json!({
            "dental": { "procedures": [{ "tooth": 36, "procedure": "filling", "surface": "mo" }] }
        }))
        .unwrap();
        assert_eq!(parsed.specialty(), Specialty::Dental);
    }

    #[test]
    fn blood_pressure_bounds() {
        assert!(cardiology(120, 80).validate().is_ok());
        let err = cardiology(40, 90).validate().unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.get("details.systolic").is_some());
        assert!(fields.get("details.diastolic").is_some());
    }

    #[test]
    fn audiogram_rules() {
        let details = SpecialtyDetails::Audiology(AudiologyDetails {
            audiogram: vec![
                AudiogramPoint {
                    ear: Ear::Left,
                    frequency_hz: 1000,
                    threshold_db: 30,
                },
                AudiogramPoint {
                    ear: Ear::Left,
                    frequency_hz: 1000,
                    threshold_db: 35,
                },
                AudiogramPoint {
                    ear: Ear::Right,
                    frequency_hz: 1500,
                    threshold_db: 130,
                },
            ],
            ..Default::default()
        });
        let err = details.validate().unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.get("details.audiogram[1]").is_some());
        assert!(fields.get("details.audiogram[2].frequencyHz").is_some());
        assert!(fields.get("details.audiogram[2].thresholdDb").is_some());
    }

    #[test]
    fn fdi_tooth_numbers() {
        for valid in [11, 18, 21, 28, 31, 38, 41, 48] {
            assert!(is_valid_fdi_tooth(valid), "{valid} should be valid");
        }
        for invalid in [0, 10, 19, 29, 50, 51, 9, 49] {
            assert!(!is_valid_fdi_tooth(invalid), "{invalid} should be invalid");
        }
    }

    #[test]
    fn physiotherapy_pain_scale() {
        let details = SpecialtyDetails::Physiotherapy(PhysiotherapyDetails {
            session_number: 1,
            pain_before: 11,
            pain_after: 3,
            exercises: vec!["squats".into()],
            range_of_motion_notes: None,
        });
        let err = details.validate().unwrap_err();
        assert!(err.field_errors().unwrap().get("details.painBefore").is_some());
    }

    #[test]
    fn sanitizes_free_text_and_surfaces() {
        let details = SpecialtyDetails::Dental(DentalDetails {
            procedures: vec![DentalProcedure {
                tooth: 36,
                procedure: "<i>filling</i>".into(),
                surface: Some(" mo ".into()),
            }],
            oral_hygiene_score: Some(7),
        })
        .sanitized();
        match details {
            SpecialtyDetails::Dental(d) => {
                assert_eq!(d.procedures[0].procedure, "&lt;i&gt;filling&lt;/i&gt;");
                assert_eq!(d.procedures[0].surface.as_deref(), Some("MO"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
