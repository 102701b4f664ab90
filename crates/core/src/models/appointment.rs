//! Appointments and recurring appointment series.

use super::{clean, notes_field};
use crate::constants::MAX_SHORT_TEXT_LEN;
use crate::store::Record;
use crate::validation::{Validate, Validator};
use chrono::{DateTime, Duration, Months, Utc};
use clinic_types::TenantId;
use clinic_uuid::RecordId;
use serde::{Deserialize, Serialize};

pub const MIN_APPOINTMENT_MINUTES: i64 = 5;
pub const MAX_APPOINTMENT_MINUTES: i64 = 480;
pub const MAX_OCCURRENCES: u32 = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, Confirmed | Cancelled | NoShow)
                | (Confirmed, CheckedIn | Cancelled | NoShow)
                | (CheckedIn, InProgress | NoShow)
                | (InProgress, Completed)
        )
    }

    /// Appointments in these states can still be moved to another time.
    pub fn is_reschedulable(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }

    /// Whether the appointment still occupies its provider's time.
    pub fn blocks_provider(self) -> bool {
        self != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum AppointmentType {
    #[default]
    Consultation,
    FollowUp,
    Procedure,
    Therapy,
    Screening,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub branch_id: RecordId,
    pub patient_id: RecordId,
    pub provider_id: RecordId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub recurring_series_id: Option<RecordId>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Half-open interval overlap: back-to-back appointments do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl Record for Appointment {
    const KIND: &'static str = "appointment";

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

fn check_times(v: &mut Validator, start: DateTime<Utc>, end: DateTime<Utc>) {
    if end <= start {
        v.error("end", "must be after start");
        return;
    }
    let minutes = (end - start).num_minutes();
    v.check(
        (MIN_APPOINTMENT_MINUTES..=MAX_APPOINTMENT_MINUTES).contains(&minutes),
        "end",
        format!(
            "duration must be between {MIN_APPOINTMENT_MINUTES} and {MAX_APPOINTMENT_MINUTES} minutes"
        ),
    );
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub branch_id: Option<RecordId>,
    pub patient_id: RecordId,
    pub provider_id: RecordId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl Validate for NewAppointment {
    fn collect_errors(&self, v: &mut Validator) {
        check_times(v, self.start, self.end);
        v.optional_text("reason", self.reason.as_deref(), MAX_SHORT_TEXT_LEN);
        notes_field(v, "notes", self.notes.as_deref());
    }
}

impl NewAppointment {
    pub(crate) fn into_appointment(
        self,
        tenant_id: TenantId,
        branch_id: RecordId,
        now: DateTime<Utc>,
    ) -> crate::ClinicResult<Appointment> {
        let mut v = Validator::new();
        check_times(&mut v, self.start, self.end);
        let reason = v.optional_text("reason", self.reason.as_deref(), MAX_SHORT_TEXT_LEN);
        let notes = notes_field(&mut v, "notes", self.notes.as_deref());

        v.finish_with(|| {
            Some(Appointment {
                id: RecordId::new(),
                tenant_id,
                branch_id,
                patient_id: self.patient_id,
                provider_id: self.provider_id,
                start: self.start,
                end: self.end,
                appointment_type: self.appointment_type,
                status: AppointmentStatus::Scheduled,
                reason: reason?.map(|r| clean(r.as_str(), MAX_SHORT_TEXT_LEN)),
                notes: notes?,
                recurring_series_id: None,
                cancellation_reason: None,
                created_at: now,
                updated_at: now,
            })
        })
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: AppointmentStatus,
    /// Recorded when cancelling
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reschedule {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Validate for Reschedule {
    fn collect_errors(&self, v: &mut Validator) {
        check_times(v, self.start, self.end);
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AppointmentFilter {
    #[param(value_type = Option<String>)]
    pub patient_id: Option<RecordId>,
    #[param(value_type = Option<String>)]
    pub provider_id: Option<RecordId>,
    #[param(value_type = Option<String>)]
    pub status: Option<AppointmentStatus>,
    /// Appointments starting at or after this instant
    #[param(value_type = Option<String>)]
    pub from: Option<DateTime<Utc>>,
    /// Appointments starting before this instant
    #[param(value_type = Option<String>)]
    pub to: Option<DateTime<Utc>>,
}

impl AppointmentFilter {
    pub fn matches(&self, a: &Appointment) -> bool {
        self.patient_id.map_or(true, |p| a.patient_id == p)
            && self.provider_id.map_or(true, |p| a.provider_id == p)
            && self.status.map_or(true, |s| a.status == s)
            && self.from.map_or(true, |from| a.start >= from)
            && self.to.map_or(true, |to| a.start < to)
    }
}

// ============================================================================
// RECURRING SERIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

/// Start instants of a series. Monthly occurrences keep the first day of month, clamped to
/// the month's last day (31 Jan, 28/29 Feb, 31 Mar).
pub fn occurrence_starts(
    first_start: DateTime<Utc>,
    frequency: RecurrenceFrequency,
    occurrences: u32,
) -> Vec<DateTime<Utc>> {
    (0..occurrences)
        .filter_map(|i| match frequency {
            RecurrenceFrequency::Daily => Some(first_start + Duration::days(i64::from(i))),
            RecurrenceFrequency::Weekly => Some(first_start + Duration::weeks(i64::from(i))),
            RecurrenceFrequency::Biweekly => {
                Some(first_start + Duration::weeks(2 * i64::from(i)))
            }
            RecurrenceFrequency::Monthly => first_start.checked_add_months(Months::new(i)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecurringAppointment {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub branch_id: RecordId,
    pub patient_id: RecordId,
    pub provider_id: RecordId,
    pub first_start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub frequency: RecurrenceFrequency,
    pub occurrences: u32,
    pub appointment_type: AppointmentType,
    pub reason: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringAppointment {
    pub fn occurrence_starts(&self) -> Vec<DateTime<Utc>> {
        occurrence_starts(self.first_start, self.frequency, self.occurrences)
    }
}

impl Record for RecurringAppointment {
    const KIND: &'static str = "recurring_appointment";

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
pub struct NewRecurringSeries {
    pub branch_id: Option<RecordId>,
    pub patient_id: RecordId,
    pub provider_id: RecordId,
    pub first_start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub frequency: RecurrenceFrequency,
    pub occurrences: u32,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    pub reason: Option<String>,
}

impl Validate for NewRecurringSeries {
    fn collect_errors(&self, v: &mut Validator) {
        v.range(
            "durationMinutes",
            i64::from(self.duration_minutes),
            MIN_APPOINTMENT_MINUTES,
            MAX_APPOINTMENT_MINUTES,
        );
        v.range("occurrences", self.occurrences, 1, MAX_OCCURRENCES);
        v.optional_text("reason", self.reason.as_deref(), MAX_SHORT_TEXT_LEN);
    }
}

impl NewRecurringSeries {
    pub(crate) fn into_series(
        self,
        tenant_id: TenantId,
        branch_id: RecordId,
        now: DateTime<Utc>,
    ) -> crate::ClinicResult<RecurringAppointment> {
        self.validate()?;
        Ok(RecurringAppointment {
            id: RecordId::new(),
            tenant_id,
            branch_id,
            patient_id: self.patient_id,
            provider_id: self.provider_id,
            first_start: self.first_start,
            duration_minutes: self.duration_minutes,
            frequency: self.frequency,
            occurrences: self.occurrences,
            appointment_type: self.appointment_type,
            reason: self
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(|r| clean(r, MAX_SHORT_TEXT_LEN)),
            active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn status_machine() {
        use AppointmentStatus::*;
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(CheckedIn));
        assert!(CheckedIn.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(CheckedIn.can_transition_to(NoShow));

        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!CheckedIn.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!Scheduled.can_transition_to(Scheduled));
    }

    #[test]
    fn monthly_series_clamps_day() {
        let starts = occurrence_starts(at(2025, 1, 31, 9), RecurrenceFrequency::Monthly, 4);
        assert_eq!(
            starts,
            vec![
                at(2025, 1, 31, 9),
                at(2025, 2, 28, 9),
                at(2025, 3, 31, 9),
                at(2025, 4, 30, 9),
            ]
        );
    }

    #[test]
    fn biweekly_series_steps_fourteen_days() {
        let starts = occurrence_starts(at(2025, 3, 3, 14), RecurrenceFrequency::Biweekly, 3);
        assert_eq!(starts[2], at(2025, 3, 31, 14));
    }

    #[test]
    fn appointment_times_are_validated() {
        let input = NewAppointment {
            branch_id: None,
            patient_id: RecordId::new(),
            provider_id: RecordId::new(),
            start: at(2025, 5, 1, 10),
            end: at(2025, 5, 1, 10) + Duration::minutes(3),
            appointment_type: AppointmentType::Consultation,
            reason: None,
            notes: None,
        };
        let err = input.validate().unwrap_err();
        assert!(err.field_errors().unwrap().get("end").is_some());

        let backwards = NewAppointment {
            end: at(2025, 5, 1, 9),
            ..input
        };
        assert!(backwards.validate().is_err());
    }

    #[test]
    fn series_bounds() {
        let series = NewRecurringSeries {
            branch_id: None,
            patient_id: RecordId::new(),
            provider_id: RecordId::new(),
            first_start: at(2025, 5, 1, 10),
            duration_minutes: 30,
            frequency: RecurrenceFrequency::Weekly,
            occurrences: 53,
            appointment_type: AppointmentType::Therapy,
            reason: None,
        };
        let err = series.validate().unwrap_err();
        assert!(err.field_errors().unwrap().get("occurrences").is_some());
    }

    #[test]
    fn back_to_back_does_not_overlap() {
        let a = Appointment {
            id: RecordId::new(),
            tenant_id: TenantId::new("acme").unwrap(),
            branch_id: RecordId::new(),
            patient_id: RecordId::new(),
            provider_id: RecordId::new(),
            start: at(2025, 5, 1, 9),
            end: at(2025, 5, 1, 10),
            appointment_type: AppointmentType::Consultation,
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            recurring_series_id: None,
            cancellation_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!a.overlaps(at(2025, 5, 1, 10), at(2025, 5, 1, 11)));
        assert!(a.overlaps(at(2025, 5, 1, 8), at(2025, 5, 1, 10)));
        assert_eq!(a.duration_minutes(), 60);
    }
}
