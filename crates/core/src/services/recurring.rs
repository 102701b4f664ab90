//! Recurring appointment series.

use super::{require_patient, AppointmentService};
use crate::models::{
    Appointment, AppointmentStatus, NewRecurringSeries, RecurringAppointment,
};
use crate::store::Stores;
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::{Duration, Utc};
use clinic_uuid::RecordId;
use serde::Serialize;

/// A newly created series together with every appointment it booked.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSeries {
    pub series: RecurringAppointment,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelledSeries {
    pub series: RecurringAppointment,
    /// Future occurrences that were cancelled
    pub cancelled_count: usize,
}

#[derive(Clone)]
pub struct RecurringAppointmentService {
    stores: Stores,
    appointments: AppointmentService,
}

impl RecurringAppointmentService {
    pub fn new(stores: Stores, appointments: AppointmentService) -> Self {
        Self {
            stores,
            appointments,
        }
    }

    /// Creates a series and books every occurrence.
    ///
    /// Booking is all-or-nothing: if any occurrence clashes with the provider's calendar (or
    /// with another occurrence) nothing is stored.
    ///
    /// # Errors
    ///
    /// `Conflict` naming the date of the first clashing occurrence.
    pub fn create_series(
        &self,
        scope: &TenantScope,
        input: NewRecurringSeries,
    ) -> ClinicResult<ScheduledSeries> {
        let branch_id = scope.resolve_branch(input.branch_id)?;
        let now = Utc::now();
        let series = input.into_series(scope.tenant_id().clone(), branch_id, now)?;
        require_patient(&self.stores, scope, &series.patient_id)?;

        let length = Duration::minutes(i64::from(series.duration_minutes));
        let occurrences: Vec<Appointment> = series
            .occurrence_starts()
            .into_iter()
            .map(|start| Appointment {
                id: RecordId::new(),
                tenant_id: series.tenant_id.clone(),
                branch_id: series.branch_id,
                patient_id: series.patient_id,
                provider_id: series.provider_id,
                start,
                end: start + length,
                appointment_type: series.appointment_type,
                status: AppointmentStatus::Scheduled,
                reason: series.reason.clone(),
                notes: None,
                recurring_series_id: Some(series.id),
                cancellation_reason: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let guard = self.stores.write_guard()?;
        for (i, occurrence) in occurrences.iter().enumerate() {
            self.appointments
                .ensure_provider_free(&guard, occurrence, &occurrences[..i])?;
        }

        self.stores.recurring.insert(series.clone())?;
        let mut stored: Vec<RecordId> = Vec::with_capacity(occurrences.len());
        for occurrence in &occurrences {
            if let Err(e) = self.stores.appointments.insert(occurrence.clone()) {
                self.roll_back(&series, &stored);
                return Err(e);
            }
            stored.push(occurrence.id);
        }

        tracing::info!(
            "created {:?} series {} with {} appointments",
            series.frequency,
            series.id,
            occurrences.len()
        );
        Ok(ScheduledSeries {
            series,
            appointments: occurrences,
        })
    }

    fn roll_back(&self, series: &RecurringAppointment, stored: &[RecordId]) {
        for id in stored {
            if let Err(e) = self.stores.appointments.remove(id) {
                tracing::error!("failed to roll back appointment {}: {}", id, e);
            }
        }
        if let Err(e) = self.stores.recurring.remove(&series.id) {
            tracing::error!("failed to roll back series {}: {}", series.id, e);
        }
    }

    /// Cancels every future Scheduled or Confirmed occurrence and deactivates the series.
    ///
    /// Past and already attended occurrences are left alone.
    pub fn cancel_series(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<CancelledSeries> {
        let _guard = self.stores.write_guard()?;
        let mut series = scope.fetch(self.stores.recurring.as_ref(), id)?;
        if !series.active {
            return Err(ClinicError::Conflict(format!(
                "series {id} is already cancelled"
            )));
        }

        let now = Utc::now();
        let mut cancelled_count = 0;
        for mut appointment in self.stores.appointments.list()? {
            let in_series = appointment.tenant_id == series.tenant_id
                && appointment.recurring_series_id == Some(series.id);
            if in_series && appointment.start > now && appointment.status.is_reschedulable() {
                appointment.status = AppointmentStatus::Cancelled;
                appointment.cancellation_reason = Some("recurring series cancelled".into());
                appointment.updated_at = now;
                self.stores.appointments.update(appointment)?;
                cancelled_count += 1;
            }
        }

        series.active = false;
        series.updated_at = now;
        self.stores.recurring.update(series.clone())?;
        tracing::info!(
            "cancelled series {} ({} future appointments)",
            id,
            cancelled_count
        );
        Ok(CancelledSeries {
            series,
            cancelled_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentFilter, AppointmentType, NewAppointment, RecurrenceFrequency, StatusChange};
    use crate::pagination::PageRequest;
    use crate::services::test_support::{patient, scope, services};
    use chrono::{DateTime, Datelike, TimeZone};

    fn series_input(
        patient_id: RecordId,
        provider_id: RecordId,
        first_start: DateTime<Utc>,
        frequency: RecurrenceFrequency,
        occurrences: u32,
    ) -> NewRecurringSeries {
        NewRecurringSeries {
            branch_id: None,
            patient_id,
            provider_id,
            first_start,
            duration_minutes: 45,
            frequency,
            occurrences,
            appointment_type: AppointmentType::Therapy,
            reason: Some("knee rehab".into()),
        }
    }

    #[test]
    fn books_every_occurrence() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let patient = patient(&services, &scope);
        let first = Utc.with_ymd_and_hms(2031, 1, 31, 9, 0, 0).unwrap();

        let booked = services
            .recurring
            .create_series(
                &scope,
                series_input(patient.id, RecordId::new(), first, RecurrenceFrequency::Monthly, 3),
            )
            .unwrap();
        let days: Vec<(u32, u32)> = booked
            .appointments
            .iter()
            .map(|a| (a.start.month(), a.start.day()))
            .collect();
        assert_eq!(days, vec![(1, 31), (2, 28), (3, 31)]);
        assert!(booked
            .appointments
            .iter()
            .all(|a| a.recurring_series_id == Some(booked.series.id) && a.duration_minutes() == 45));
    }

    #[test]
    fn clash_stores_nothing_and_names_the_date() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let patient = patient(&services, &scope);
        let provider = RecordId::new();
        let first = Utc.with_ymd_and_hms(2031, 3, 3, 9, 0, 0).unwrap();

        let blocker = first + Duration::weeks(2);
        services
            .appointments
            .create(
                &scope,
                NewAppointment {
                    branch_id: None,
                    patient_id: patient.id,
                    provider_id: provider,
                    start: blocker,
                    end: blocker + Duration::minutes(30),
                    appointment_type: AppointmentType::Consultation,
                    reason: None,
                    notes: None,
                },
            )
            .unwrap();

        let err = services
            .recurring
            .create_series(
                &scope,
                series_input(patient.id, provider, first, RecurrenceFrequency::Weekly, 4),
            )
            .unwrap_err();
        match err {
            ClinicError::Conflict(message) => assert!(message.contains("2031-03-17"), "{message}"),
            other => panic!("expected conflict, got {other:?}"),
        }

        assert_eq!(services.stores().appointments.count().unwrap(), 1);
        assert_eq!(services.stores().recurring.count().unwrap(), 0);
    }

    #[test]
    fn cancel_series_only_touches_future_open_occurrences() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let patient = patient(&services, &scope);
        let first = Utc::now() + Duration::days(1);

        let booked = services
            .recurring
            .create_series(
                &scope,
                series_input(patient.id, RecordId::new(), first, RecurrenceFrequency::Daily, 3),
            )
            .unwrap();
        services
            .appointments
            .update_status(
                &scope,
                &booked.appointments[0].id,
                StatusChange {
                    status: AppointmentStatus::Confirmed,
                    reason: None,
                },
            )
            .unwrap();

        let cancelled = services
            .recurring
            .cancel_series(&scope, &booked.series.id)
            .unwrap();
        assert_eq!(cancelled.cancelled_count, 3);
        assert!(!cancelled.series.active);

        let remaining = services
            .appointments
            .list(
                &scope,
                &AppointmentFilter {
                    status: Some(AppointmentStatus::Scheduled),
                    ..Default::default()
                },
                &PageRequest::default(),
            )
            .unwrap();
        assert_eq!(remaining.total_count, 0);

        assert!(matches!(
            services.recurring.cancel_series(&scope, &booked.series.id),
            Err(ClinicError::Conflict(_))
        ));
    }
}
