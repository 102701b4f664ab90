//! Clinic entities and their create/update inputs.
//!
//! Stored records use validated types. Inputs arrive as plain strings so that every bad field
//! can be reported at once; each input turns itself into a record only after a
//! [`Validator`] pass succeeds.

mod appointment;
mod billing;
mod clinical;
mod crm;
mod employee;
mod inventory;
mod patient;
mod visit;
mod waitlist;

pub use appointment::{
    occurrence_starts, Appointment, AppointmentFilter, AppointmentStatus, AppointmentType,
    NewAppointment, NewRecurringSeries, RecurrenceFrequency, RecurringAppointment, Reschedule,
    StatusChange, MAX_APPOINTMENT_MINUTES, MAX_OCCURRENCES, MIN_APPOINTMENT_MINUTES,
};
pub use billing::{
    Invoice, InvoiceFilter, InvoiceStatus, InvoiceTotals, LineItem, NewInvoice, NewLineItem,
    NewPayment, Payment, PaymentMethod,
};
pub use clinical::{
    Diagnosis, DiagnosisStatus, NewDiagnosis, NewPrescription, Prescription,
    PrescriptionStatus, ResolveDiagnosis,
};
pub use crm::{
    Campaign, CampaignChannel, CampaignStats, CampaignStatus, ConvertLead, Lead, LeadFilter,
    LeadStatus, NewCampaign, NewLead,
};
pub use employee::{
    Employee, EmployeeFilter, EmployeeRole, EmployeeStatus, NewEmployee, Termination,
};
pub use inventory::{
    InventoryCategory, InventoryItem, NewInventoryItem, StockAdjustment, StockMovement,
};
pub use patient::{NewPatient, Patient, Sex, UpdatePatient};
pub use visit::{
    AudiogramPoint, AudiologyDetails, CardiologyDetails, ClinicalVisit, DentalDetails,
    DentalProcedure, DermatologyDetails, Ear, EegResult, Lesion, NeurologyDetails, NewVisit,
    OphthalmologyDetails, PhysiotherapyDetails, Specialty, SpecialtyDetails, TympanogramType,
    VisitFilter, VisitStatus,
};
pub use waitlist::{NewWaitlistEntry, WaitlistEntry, WaitlistPriority, WaitlistStatus};

use crate::constants::MAX_NOTES_LEN;
use crate::sanitizer::sanitize_text;
use crate::validation::Validator;
use chrono::NaiveDate;

/// Earliest date accepted for dates of birth and clinical dates.
pub(crate) fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Optional free text: bounded before sanitising, then stored sanitised.
pub(crate) fn notes_field(
    v: &mut Validator,
    field: &str,
    value: Option<&str>,
) -> Option<Option<String>> {
    v.optional_text(field, value, MAX_NOTES_LEN)
        .map(|text| text.map(|t| sanitize_text(t.as_str(), MAX_NOTES_LEN)))
}

/// Sanitises free text already known to be within bounds.
pub(crate) fn clean(text: &str, max_len: usize) -> String {
    sanitize_text(text, max_len)
}
