//! Appointment booking and the appointment status machine.

use super::require_patient;
use crate::constants::MAX_SHORT_TEXT_LEN;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, NewAppointment, Reschedule, StatusChange,
};
use crate::pagination::{Page, PageRequest};
use crate::sanitizer::sanitize_text;
use crate::store::{Stores, WriteGuard};
use crate::validation::{Validate, Validator};
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::Utc;
use clinic_uuid::RecordId;

#[derive(Clone)]
pub struct AppointmentService {
    stores: Stores,
}

impl AppointmentService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Books an appointment.
    ///
    /// # Errors
    ///
    /// - `Validation` for bad times or text
    /// - `NotFound` if the patient does not exist in the tenant
    /// - `Conflict` if the provider is already booked for an overlapping slot
    pub fn create(&self, scope: &TenantScope, input: NewAppointment) -> ClinicResult<Appointment> {
        let appointment = self.prepare(scope, input)?;
        let guard = self.stores.write_guard()?;
        self.schedule_locked(&guard, appointment)
    }

    /// Validates `input` and checks the patient, without touching the provider's calendar.
    pub(crate) fn prepare(
        &self,
        scope: &TenantScope,
        input: NewAppointment,
    ) -> ClinicResult<Appointment> {
        let branch_id = scope.resolve_branch(input.branch_id)?;
        let appointment =
            input.into_appointment(scope.tenant_id().clone(), branch_id, Utc::now())?;
        require_patient(&self.stores, scope, &appointment.patient_id)?;
        Ok(appointment)
    }

    /// Inserts `appointment` once its slot is known to be free.
    pub(crate) fn schedule_locked(
        &self,
        guard: &WriteGuard<'_>,
        appointment: Appointment,
    ) -> ClinicResult<Appointment> {
        self.ensure_provider_free(guard, &appointment, &[])?;
        self.stores.appointments.insert(appointment.clone())?;
        tracing::info!(
            "booked appointment {} for provider {} at {}",
            appointment.id,
            appointment.provider_id,
            appointment.start
        );
        Ok(appointment)
    }

    /// Fails with `Conflict` if `candidate` overlaps a stored appointment of the same provider
    /// or one of `pending`, which are about to be stored alongside it.
    pub(crate) fn ensure_provider_free(
        &self,
        _guard: &WriteGuard<'_>,
        candidate: &Appointment,
        pending: &[Appointment],
    ) -> ClinicResult<()> {
        let stored = self.stores.appointments.list()?;
        let clash = stored
            .iter()
            .chain(pending)
            .filter(|a| a.tenant_id == candidate.tenant_id)
            .filter(|a| a.id != candidate.id && a.provider_id == candidate.provider_id)
            .filter(|a| a.status.blocks_provider())
            .find(|a| a.overlaps(candidate.start, candidate.end));

        match clash {
            Some(existing) => Err(ClinicError::Conflict(format!(
                "provider is already booked on {} from {} to {}",
                candidate.start.date_naive(),
                existing.start.format("%H:%M"),
                existing.end.format("%H:%M")
            ))),
            None => Ok(()),
        }
    }

    pub fn get(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<Appointment> {
        scope.fetch(self.stores.appointments.as_ref(), id)
    }

    /// Appointments matching `filter`, ordered by start time.
    pub fn list(
        &self,
        scope: &TenantScope,
        filter: &AppointmentFilter,
        page: &PageRequest,
    ) -> ClinicResult<Page<Appointment>> {
        let mut found: Vec<Appointment> = scope
            .list(self.stores.appointments.as_ref())?
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect();
        found.sort_by_key(|a| (a.start, a.id));
        Ok(Page::from_vec(found, page))
    }

    /// Moves an appointment along its status machine.
    ///
    /// # Errors
    ///
    /// `Conflict` if the transition is not allowed from the current status.
    pub fn update_status(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        change: StatusChange,
    ) -> ClinicResult<Appointment> {
        let mut v = Validator::new();
        let reason = v.optional_text("reason", change.reason.as_deref(), MAX_SHORT_TEXT_LEN);
        let reason = v.finish_with(|| reason)?;

        let _guard = self.stores.write_guard()?;
        let mut appointment = self.get(scope, id)?;
        if !appointment.status.can_transition_to(change.status) {
            return Err(ClinicError::Conflict(format!(
                "appointment cannot move from {:?} to {:?}",
                appointment.status, change.status
            )));
        }

        let previous = appointment.status;
        appointment.status = change.status;
        if change.status == AppointmentStatus::Cancelled {
            appointment.cancellation_reason =
                reason.map(|r| sanitize_text(r.as_str(), MAX_SHORT_TEXT_LEN));
        }
        appointment.updated_at = Utc::now();
        self.stores.appointments.update(appointment.clone())?;
        tracing::info!(
            "appointment {} moved from {:?} to {:?}",
            id,
            previous,
            appointment.status
        );
        Ok(appointment)
    }

    /// Moves a Scheduled or Confirmed appointment to a new slot.
    pub fn reschedule(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        input: Reschedule,
    ) -> ClinicResult<Appointment> {
        input.validate()?;
        let guard = self.stores.write_guard()?;
        let mut appointment = self.get(scope, id)?;
        if !appointment.status.is_reschedulable() {
            return Err(ClinicError::Conflict(format!(
                "a {:?} appointment cannot be rescheduled",
                appointment.status
            )));
        }

        appointment.start = input.start;
        appointment.end = input.end;
        self.ensure_provider_free(&guard, &appointment, &[])?;
        appointment.updated_at = Utc::now();
        self.stores.appointments.update(appointment.clone())?;
        tracing::info!("rescheduled appointment {} to {}", id, appointment.start);
        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentType;
    use crate::services::test_support::{other_scope, patient, scope, services};
    use chrono::{DateTime, Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2031, 5, 12, h, m, 0).unwrap()
    }

    fn booking(patient_id: RecordId, provider_id: RecordId, start: DateTime<Utc>) -> NewAppointment {
        NewAppointment {
            branch_id: None,
            patient_id,
            provider_id,
            start,
            end: start + Duration::minutes(30),
            appointment_type: AppointmentType::Consultation,
            reason: Some("hearing check".into()),
            notes: None,
        }
    }

    #[test]
    fn provider_overlap_conflicts_but_back_to_back_is_fine() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let patient = patient(&services, &scope);
        let provider = RecordId::new();
        let appointments = &services.appointments;

        appointments
            .create(&scope, booking(patient.id, provider, at(9, 0)))
            .unwrap();
        let err = appointments
            .create(&scope, booking(patient.id, provider, at(9, 15)))
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        appointments
            .create(&scope, booking(patient.id, provider, at(9, 30)))
            .unwrap();
        appointments
            .create(&scope, booking(patient.id, RecordId::new(), at(9, 15)))
            .unwrap();
    }

    #[test]
    fn cancelled_slot_is_free_again() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let patient = patient(&services, &scope);
        let provider = RecordId::new();

        let first = services
            .appointments
            .create(&scope, booking(patient.id, provider, at(10, 0)))
            .unwrap();
        let cancelled = services
            .appointments
            .update_status(
                &scope,
                &first.id,
                StatusChange {
                    status: AppointmentStatus::Cancelled,
                    reason: Some("patient <unwell>".into()),
                },
            )
            .unwrap();
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some("patient &lt;unwell&gt;")
        );

        services
            .appointments
            .create(&scope, booking(patient.id, provider, at(10, 0)))
            .unwrap();
    }

    #[test]
    fn status_machine_is_enforced() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let patient = patient(&services, &scope);
        let appt = services
            .appointments
            .create(&scope, booking(patient.id, RecordId::new(), at(11, 0)))
            .unwrap();

        let change = |status| StatusChange {
            status,
            reason: None,
        };
        let err = services
            .appointments
            .update_status(&scope, &appt.id, change(AppointmentStatus::Completed))
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        for status in [
            AppointmentStatus::Confirmed,
            AppointmentStatus::CheckedIn,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
        ] {
            services
                .appointments
                .update_status(&scope, &appt.id, change(status))
                .unwrap();
        }

        let err = services
            .appointments
            .reschedule(
                &scope,
                &appt.id,
                Reschedule {
                    start: at(15, 0),
                    end: at(15, 30),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[test]
    fn reschedule_checks_overlap_but_ignores_itself() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let patient = patient(&services, &scope);
        let provider = RecordId::new();
        let a = services
            .appointments
            .create(&scope, booking(patient.id, provider, at(9, 0)))
            .unwrap();
        services
            .appointments
            .create(&scope, booking(patient.id, provider, at(10, 0)))
            .unwrap();

        let moved = services
            .appointments
            .reschedule(
                &scope,
                &a.id,
                Reschedule {
                    start: at(9, 10),
                    end: at(9, 50),
                },
            )
            .unwrap();
        assert_eq!(moved.duration_minutes(), 40);

        let err = services
            .appointments
            .reschedule(
                &scope,
                &a.id,
                Reschedule {
                    start: at(9, 45),
                    end: at(10, 15),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[test]
    fn requires_patient_in_tenant() {
        let (services, _temp) = services();
        let foreign = patient(&services, &other_scope());
        let scope = scope().with_branch(RecordId::new());

        let err = services
            .appointments
            .create(&scope, booking(RecordId::new(), RecordId::new(), at(9, 0)))
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotFound { .. }));

        let err = services
            .appointments
            .create(&scope, booking(foreign.id, RecordId::new(), at(9, 0)))
            .unwrap_err();
        assert!(matches!(err, ClinicError::TenantIsolationViolation { .. }));
    }

    #[test]
    fn list_filters_and_orders_by_start() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let patient = patient(&services, &scope);
        let provider = RecordId::new();
        for start in [at(14, 0), at(8, 0), at(11, 0)] {
            services
                .appointments
                .create(&scope, booking(patient.id, provider, start))
                .unwrap();
        }

        let filter = AppointmentFilter {
            provider_id: Some(provider),
            from: Some(at(9, 0)),
            ..Default::default()
        };
        let page = services
            .appointments
            .list(&scope, &filter, &PageRequest::default())
            .unwrap();
        let starts: Vec<_> = page.items.iter().map(|a| a.start).collect();
        assert_eq!(starts, vec![at(11, 0), at(14, 0)]);
    }
}
