use super::{require_patient, AppointmentService};
use crate::models::{Appointment, NewAppointment, NewWaitlistEntry, WaitlistEntry, WaitlistStatus};
use crate::store::Stores;
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::Utc;
use clinic_uuid::RecordId;
use serde::Serialize;

/// Result of booking a waitlist entry.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistBooking {
    pub entry: WaitlistEntry,
    pub appointment: Appointment,
}

#[derive(Clone)]
pub struct WaitlistService {
    stores: Stores,
    appointments: AppointmentService,
}

impl WaitlistService {
    pub fn new(stores: Stores, appointments: AppointmentService) -> Self {
        Self {
            stores,
            appointments,
        }
    }

    pub fn add(&self, scope: &TenantScope, input: NewWaitlistEntry) -> ClinicResult<WaitlistEntry> {
        let branch_id = scope.resolve_branch(input.branch_id)?;
        require_patient(&self.stores, scope, &input.patient_id)?;
        let entry = input.into_entry(scope.tenant_id().clone(), branch_id, Utc::now())?;
        self.stores.waitlist.insert(entry.clone())?;
        tracing::info!(
            "added patient {} to waitlist with {:?} priority",
            entry.patient_id,
            entry.priority
        );
        Ok(entry)
    }

    /// Open entries (Waiting or Offered), most urgent first and first-come first-served
    /// within a priority.
    pub fn list_waiting(&self, scope: &TenantScope) -> ClinicResult<Vec<WaitlistEntry>> {
        let mut open: Vec<WaitlistEntry> = scope
            .list(self.stores.waitlist.as_ref())?
            .into_iter()
            .filter(|e| e.status.is_open())
            .collect();
        open.sort_by_key(|e| (e.priority, e.created_at, e.id));
        Ok(open)
    }

    pub fn offer(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<WaitlistEntry> {
        let _guard = self.stores.write_guard()?;
        let mut entry = scope.fetch(self.stores.waitlist.as_ref(), id)?;
        if entry.status != WaitlistStatus::Waiting {
            return Err(ClinicError::Conflict(format!(
                "only waiting entries can be offered a slot; entry is {:?}",
                entry.status
            )));
        }
        let now = Utc::now();
        entry.status = WaitlistStatus::Offered;
        entry.offered_at = Some(now);
        entry.updated_at = now;
        self.stores.waitlist.update(entry.clone())?;
        tracing::info!("offered a slot to waitlist entry {}", id);
        Ok(entry)
    }

    /// Books an appointment for the entry's patient and closes the entry.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the entry is no longer open, or the slot clashes for the provider
    /// - `Validation` if the appointment is for a different patient
    pub fn book(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        mut input: NewAppointment,
    ) -> ClinicResult<WaitlistBooking> {
        let mut entry = scope.fetch(self.stores.waitlist.as_ref(), id)?;
        if input.patient_id != entry.patient_id {
            return Err(ClinicError::invalid(
                "patientId",
                "must match the waitlist entry's patient",
            ));
        }
        input.branch_id = input.branch_id.or(Some(entry.branch_id));
        let appointment = self.appointments.prepare(scope, input)?;

        let guard = self.stores.write_guard()?;
        // Re-read under the lock so two bookings of one entry cannot both succeed.
        entry = scope.fetch(self.stores.waitlist.as_ref(), id)?;
        if !entry.status.is_open() {
            return Err(ClinicError::Conflict(format!(
                "waitlist entry is already {:?}",
                entry.status
            )));
        }
        let appointment = self.appointments.schedule_locked(&guard, appointment)?;

        entry.status = WaitlistStatus::Booked;
        entry.appointment_id = Some(appointment.id);
        entry.updated_at = Utc::now();
        self.stores.waitlist.update(entry.clone())?;
        tracing::info!("waitlist entry {} booked as appointment {}", id, appointment.id);
        Ok(WaitlistBooking { entry, appointment })
    }

    pub fn cancel(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<WaitlistEntry> {
        let _guard = self.stores.write_guard()?;
        let mut entry = scope.fetch(self.stores.waitlist.as_ref(), id)?;
        if !entry.status.is_open() {
            return Err(ClinicError::Conflict(format!(
                "waitlist entry is already {:?}",
                entry.status
            )));
        }
        entry.status = WaitlistStatus::Cancelled;
        entry.updated_at = Utc::now();
        self.stores.waitlist.update(entry.clone())?;
        tracing::info!("cancelled waitlist entry {}", id);
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentType, WaitlistPriority};
    use crate::services::test_support::{new_patient, patient, scope, services};
    use chrono::{Duration, TimeZone};

    fn entry_input(patient_id: RecordId, priority: WaitlistPriority) -> NewWaitlistEntry {
        NewWaitlistEntry {
            branch_id: None,
            patient_id,
            provider_id: None,
            priority,
            preferred_from: None,
            preferred_to: None,
            notes: None,
        }
    }

    fn slot(patient_id: RecordId) -> NewAppointment {
        let start = Utc.with_ymd_and_hms(2031, 6, 2, 14, 0, 0).unwrap();
        NewAppointment {
            branch_id: None,
            patient_id,
            provider_id: RecordId::new(),
            start,
            end: start + Duration::minutes(20),
            appointment_type: AppointmentType::FollowUp,
            reason: None,
            notes: None,
        }
    }

    #[test]
    fn urgent_first_then_fifo() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let p = patient(&services, &scope);

        let normal_1 = services
            .waitlist
            .add(&scope, entry_input(p.id, WaitlistPriority::Normal))
            .unwrap();
        let urgent = services
            .waitlist
            .add(&scope, entry_input(p.id, WaitlistPriority::Urgent))
            .unwrap();
        let normal_2 = services
            .waitlist
            .add(&scope, entry_input(p.id, WaitlistPriority::Normal))
            .unwrap();
        let low = services
            .waitlist
            .add(&scope, entry_input(p.id, WaitlistPriority::Low))
            .unwrap();
        services.waitlist.cancel(&scope, &low.id).unwrap();

        let order: Vec<RecordId> = services
            .waitlist
            .list_waiting(&scope)
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(order, vec![urgent.id, normal_1.id, normal_2.id]);
    }

    #[test]
    fn offer_then_book_creates_appointment() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let p = patient(&services, &scope);
        let entry = services
            .waitlist
            .add(&scope, entry_input(p.id, WaitlistPriority::High))
            .unwrap();

        let offered = services.waitlist.offer(&scope, &entry.id).unwrap();
        assert_eq!(offered.status, WaitlistStatus::Offered);
        assert!(offered.offered_at.is_some());

        let booking = services.waitlist.book(&scope, &entry.id, slot(p.id)).unwrap();
        assert_eq!(booking.entry.status, WaitlistStatus::Booked);
        assert_eq!(booking.entry.appointment_id, Some(booking.appointment.id));
        assert_eq!(
            services
                .appointments
                .get(&scope, &booking.appointment.id)
                .unwrap()
                .branch_id,
            entry.branch_id
        );

        assert!(matches!(
            services.waitlist.book(&scope, &entry.id, slot(p.id)),
            Err(ClinicError::Conflict(_))
        ));
        assert!(matches!(
            services.waitlist.cancel(&scope, &entry.id),
            Err(ClinicError::Conflict(_))
        ));
    }

    #[test]
    fn booking_must_be_for_the_same_patient() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let p = patient(&services, &scope);
        let someone_else = services
            .patients
            .create(&scope, new_patient("Alan", "Turing"))
            .unwrap();
        let entry = services
            .waitlist
            .add(&scope, entry_input(p.id, WaitlistPriority::Normal))
            .unwrap();

        let err = services
            .waitlist
            .book(&scope, &entry.id, slot(someone_else.id))
            .unwrap_err();
        assert!(err.field_errors().unwrap().get("patientId").is_some());
    }
}
