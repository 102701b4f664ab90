//! Derived clinical metrics.
//!
//! Pure functions over recorded findings. Nothing here is stored; values are recomputed for
//! every [`VisitSummary`] so a correction to the underlying findings is always reflected.

use crate::models::{
    AudiogramPoint, ClinicalVisit, Ear, Specialty, SpecialtyDetails, VisitStatus,
};
use chrono::NaiveDate;
use clinic_uuid::RecordId;
use serde::Serialize;

const PTA_FREQUENCIES: [u32; 3] = [500, 1000, 2000];
const HIGH_FREQUENCY_PTA_FREQUENCIES: [u32; 3] = [1000, 2000, 4000];

/// Mean threshold at `frequencies` for one ear; `None` if any frequency is missing.
fn average_threshold(points: &[AudiogramPoint], ear: Ear, frequencies: &[u32]) -> Option<f64> {
    let mut sum = 0.0;
    for freq in frequencies {
        let point = points
            .iter()
            .find(|p| p.ear == ear && p.frequency_hz == *freq)?;
        sum += f64::from(point.threshold_db);
    }
    Some(sum / frequencies.len() as f64)
}

/// Pure tone average over 500, 1000 and 2000 Hz.
pub fn pure_tone_average(points: &[AudiogramPoint], ear: Ear) -> Option<f64> {
    average_threshold(points, ear, &PTA_FREQUENCIES)
}

/// Pure tone average over 1000, 2000 and 4000 Hz.
pub fn high_frequency_pta(points: &[AudiogramPoint], ear: Ear) -> Option<f64> {
    average_threshold(points, ear, &HIGH_FREQUENCY_PTA_FREQUENCIES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum HearingLossGrade {
    Normal,
    Mild,
    Moderate,
    ModeratelySevere,
    Severe,
    Profound,
}

impl HearingLossGrade {
    pub fn from_pta(pta_db: f64) -> Self {
        match pta_db {
            x if x <= 25.0 => HearingLossGrade::Normal,
            x if x <= 40.0 => HearingLossGrade::Mild,
            x if x <= 55.0 => HearingLossGrade::Moderate,
            x if x <= 70.0 => HearingLossGrade::ModeratelySevere,
            x if x <= 90.0 => HearingLossGrade::Severe,
            _ => HearingLossGrade::Profound,
        }
    }
}

/// `(2 * diastolic + systolic) / 3`
pub fn mean_arterial_pressure(systolic: u16, diastolic: u16) -> f64 {
    (2.0 * f64::from(diastolic) + f64::from(systolic)) / 3.0
}

/// ACC/AHA 2017 adult blood pressure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum BloodPressureCategory {
    Normal,
    Elevated,
    Stage1,
    Stage2,
    Crisis,
}

impl BloodPressureCategory {
    pub fn classify(systolic: u16, diastolic: u16) -> Self {
        if systolic > 180 || diastolic > 120 {
            BloodPressureCategory::Crisis
        } else if systolic >= 140 || diastolic >= 90 {
            BloodPressureCategory::Stage2
        } else if systolic >= 130 || diastolic >= 80 {
            BloodPressureCategory::Stage1
        } else if systolic >= 120 {
            BloodPressureCategory::Elevated
        } else {
            BloodPressureCategory::Normal
        }
    }
}

/// logMAR for a 6/x Snellen acuity.
pub fn log_mar(snellen_denominator: u16) -> f64 {
    (f64::from(snellen_denominator) / 6.0).log10()
}

pub fn pain_reduction(before: u8, after: u8) -> i16 {
    i16::from(before) - i16::from(after)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum GcsSeverity {
    Mild,
    Moderate,
    Severe,
}

impl GcsSeverity {
    pub fn from_score(score: u8) -> Self {
        match score {
            13.. => GcsSeverity::Mild,
            9..=12 => GcsSeverity::Moderate,
            _ => GcsSeverity::Severe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EarSummary {
    pub pta_db: Option<f64>,
    pub high_frequency_pta_db: Option<f64>,
    pub grade: Option<HearingLossGrade>,
}

fn ear_summary(points: &[AudiogramPoint], ear: Ear) -> EarSummary {
    let pta = pure_tone_average(points, ear);
    EarSummary {
        pta_db: pta,
        high_frequency_pta_db: high_frequency_pta(points, ear),
        grade: pta.map(HearingLossGrade::from_pta),
    }
}

/// Metrics derived from one specialty's findings.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpecialtyMetrics {
    #[serde(rename_all = "camelCase")]
    Audiology {
        left: EarSummary,
        right: EarSummary,
        hearing_aid_recommended: bool,
    },
    #[serde(rename_all = "camelCase")]
    Dermatology {
        lesion_count: usize,
        largest_lesion_mm: Option<f64>,
        photo_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    Neurology {
        gcs_severity: Option<GcsSeverity>,
        eeg_abnormal: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    Cardiology {
        mean_arterial_pressure: f64,
        blood_pressure_category: BloodPressureCategory,
    },
    #[serde(rename_all = "camelCase")]
    Dental {
        procedure_count: usize,
        teeth_treated: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Ophthalmology {
        log_mar_right: Option<f64>,
        log_mar_left: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Physiotherapy { pain_reduction: i16 },
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummary {
    pub visit_id: RecordId,
    pub patient_id: RecordId,
    pub specialty: Specialty,
    pub status: VisitStatus,
    pub visit_date: NaiveDate,
    pub attachment_count: usize,
    pub metrics: SpecialtyMetrics,
}

pub fn summarize(visit: &ClinicalVisit) -> VisitSummary {
    let metrics = match &visit.details {
        SpecialtyDetails::Audiology(d) => SpecialtyMetrics::Audiology {
            left: ear_summary(&d.audiogram, Ear::Left),
            right: ear_summary(&d.audiogram, Ear::Right),
            hearing_aid_recommended: d.hearing_aid_recommended,
        },
        SpecialtyDetails::Dermatology(d) => SpecialtyMetrics::Dermatology {
            lesion_count: d.lesions.len(),
            largest_lesion_mm: d.lesions.iter().map(|l| l.size_mm).reduce(f64::max),
            photo_count: visit.attachments.iter().filter(|a| a.allowed_image()).count(),
        },
        SpecialtyDetails::Neurology(d) => SpecialtyMetrics::Neurology {
            gcs_severity: d.gcs_score.map(GcsSeverity::from_score),
            eeg_abnormal: d.eeg.as_ref().map(|e| e.abnormal),
        },
        SpecialtyDetails::Cardiology(d) => SpecialtyMetrics::Cardiology {
            mean_arterial_pressure: mean_arterial_pressure(d.systolic, d.diastolic),
            blood_pressure_category: BloodPressureCategory::classify(d.systolic, d.diastolic),
        },
        SpecialtyDetails::Dental(d) => {
            let mut teeth: Vec<u8> = d.procedures.iter().map(|p| p.tooth).collect();
            teeth.sort_unstable();
            teeth.dedup();
            SpecialtyMetrics::Dental {
                procedure_count: d.procedures.len(),
                teeth_treated: teeth,
            }
        }
        SpecialtyDetails::Ophthalmology(d) => SpecialtyMetrics::Ophthalmology {
            log_mar_right: d.visual_acuity_right.map(log_mar),
            log_mar_left: d.visual_acuity_left.map(log_mar),
        },
        SpecialtyDetails::Physiotherapy(d) => SpecialtyMetrics::Physiotherapy {
            pain_reduction: pain_reduction(d.pain_before, d.pain_after),
        },
    };

    VisitSummary {
        visit_id: visit.id,
        patient_id: visit.patient_id,
        specialty: visit.specialty(),
        status: visit.status,
        visit_date: visit.visit_date,
        attachment_count: visit.attachments.len(),
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(ear: Ear, frequency_hz: u32, threshold_db: i32) -> AudiogramPoint {
        AudiogramPoint {
            ear,
            frequency_hz,
            threshold_db,
        }
    }

    #[test]
    fn pta_needs_all_three_frequencies() {
        let points = vec![
            point(Ear::Left, 500, 20),
            point(Ear::Left, 1000, 25),
            point(Ear::Left, 2000, 30),
            point(Ear::Left, 4000, 50),
            point(Ear::Right, 500, 40),
            point(Ear::Right, 1000, 45),
        ];
        assert_eq!(pure_tone_average(&points, Ear::Left), Some(25.0));
        assert_eq!(pure_tone_average(&points, Ear::Right), None);
        let hf = high_frequency_pta(&points, Ear::Left).unwrap();
        assert!((hf - 35.0).abs() < 1e-9);
    }

    #[test]
    fn hearing_loss_grade_boundaries() {
        assert_eq!(HearingLossGrade::from_pta(25.0), HearingLossGrade::Normal);
        assert_eq!(HearingLossGrade::from_pta(25.1), HearingLossGrade::Mild);
        assert_eq!(HearingLossGrade::from_pta(40.0), HearingLossGrade::Mild);
        assert_eq!(HearingLossGrade::from_pta(55.0), HearingLossGrade::Moderate);
        assert_eq!(
            HearingLossGrade::from_pta(70.0),
            HearingLossGrade::ModeratelySevere
        );
        assert_eq!(HearingLossGrade::from_pta(90.0), HearingLossGrade::Severe);
        assert_eq!(HearingLossGrade::from_pta(91.0), HearingLossGrade::Profound);
        assert_eq!(HearingLossGrade::from_pta(-5.0), HearingLossGrade::Normal);
    }

    #[test]
    fn blood_pressure_categories() {
        use BloodPressureCategory::*;
        assert_eq!(BloodPressureCategory::classify(115, 75), Normal);
        assert_eq!(BloodPressureCategory::classify(125, 75), Elevated);
        assert_eq!(BloodPressureCategory::classify(125, 85), Stage1);
        assert_eq!(BloodPressureCategory::classify(135, 70), Stage1);
        assert_eq!(BloodPressureCategory::classify(150, 85), Stage2);
        assert_eq!(BloodPressureCategory::classify(130, 95), Stage2);
        assert_eq!(BloodPressureCategory::classify(185, 100), Crisis);
        assert_eq!(BloodPressureCategory::classify(160, 125), Crisis);
    }

    #[test]
    fn mean_arterial_pressure_formula() {
        assert!((mean_arterial_pressure(120, 80) - 93.333_333).abs() < 1e-3);
    }

    #[test]
    fn log_mar_values() {
        assert!(log_mar(6).abs() < 1e-12);
        assert!((log_mar(60) - 1.0).abs() < 1e-12);
        assert!((log_mar(12) - 0.30103).abs() < 1e-4);
    }

    #[test]
    fn pain_and_gcs() {
        assert_eq!(pain_reduction(8, 3), 5);
        assert_eq!(pain_reduction(2, 6), -4);
        assert_eq!(GcsSeverity::from_score(15), GcsSeverity::Mild);
        assert_eq!(GcsSeverity::from_score(9), GcsSeverity::Moderate);
        assert_eq!(GcsSeverity::from_score(8), GcsSeverity::Severe);
    }
}
