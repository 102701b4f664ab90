use crate::routes::{
    billing, clinical, crm, employees, inventory, patients, scheduling, system, visits,
};
use clinic_core::metrics::{
    BloodPressureCategory, EarSummary, GcsSeverity, HearingLossGrade, SpecialtyMetrics,
    VisitSummary,
};
use clinic_core::models::*;
use clinic_core::pagination::{AppointmentPage, InventoryPage, InvoicePage, PatientPage};
use clinic_core::services::{
    CancelledSeries, LeadConversion, OutstandingBalance, ScheduledSeries, WaitlistBooking,
};
use clinic_core::{EmailAddress, EntityCount, NonEmptyText, PhoneNumber, RecordId, TenantId};
use clinic_files::AttachmentMetadata;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Clinic API", description = "Multi-tenant clinic records, scheduling, billing and operations"),
    paths(
        system::health,
        system::verify,
        system::diagnostics,
        patients::search_patients,
        patients::create_patient,
        patients::get_patient,
        patients::update_patient,
        patients::delete_patient,
        scheduling::list_appointments,
        scheduling::create_appointment,
        scheduling::get_appointment,
        scheduling::update_appointment_status,
        scheduling::reschedule_appointment,
        scheduling::create_series,
        scheduling::cancel_series,
        scheduling::list_waitlist,
        scheduling::add_to_waitlist,
        scheduling::offer_slot,
        scheduling::book_from_waitlist,
        scheduling::cancel_waitlist_entry,
        visits::list_visits,
        visits::create_visit,
        visits::get_visit,
        visits::update_visit_details,
        visits::complete_visit,
        visits::cancel_visit,
        visits::visit_summary,
        visits::upload_photo,
        visits::download_photo,
        clinical::create_prescription,
        clinical::list_prescriptions,
        clinical::update_prescription_status,
        clinical::create_diagnosis,
        clinical::list_diagnoses,
        clinical::resolve_diagnosis,
        billing::list_invoices,
        billing::create_invoice,
        billing::outstanding_balance,
        billing::get_invoice,
        billing::issue_invoice,
        billing::record_payment,
        billing::cancel_invoice,
        inventory::list_items,
        inventory::create_item,
        inventory::low_stock,
        inventory::expiring,
        inventory::get_item,
        inventory::delete_item,
        inventory::adjust_stock,
        employees::list_employees,
        employees::create_employee,
        employees::get_employee,
        employees::update_employee_status,
        employees::terminate_employee,
        crm::list_campaigns,
        crm::create_campaign,
        crm::update_campaign_status,
        crm::campaign_stats,
        crm::list_leads,
        crm::create_lead,
        crm::update_lead_status,
        crm::convert_lead,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::Principal,
        api_shared::Role,
        api_shared::ErrorEnvelope,
        system::Diagnostics,
        EntityCount,
        RecordId,
        TenantId,
        NonEmptyText,
        EmailAddress,
        PhoneNumber,
        clinic_uuid::Sha256Hash,
        AttachmentMetadata,
        visits::PhotoUpload,
        PatientPage,
        AppointmentPage,
        InvoicePage,
        InventoryPage,
        Patient,
        NewPatient,
        UpdatePatient,
        Sex,
        Appointment,
        AppointmentStatus,
        AppointmentType,
        NewAppointment,
        StatusChange,
        Reschedule,
        RecurringAppointment,
        RecurrenceFrequency,
        NewRecurringSeries,
        ScheduledSeries,
        CancelledSeries,
        WaitlistEntry,
        WaitlistPriority,
        WaitlistStatus,
        NewWaitlistEntry,
        WaitlistBooking,
        ClinicalVisit,
        NewVisit,
        Specialty,
        VisitStatus,
        SpecialtyDetails,
        AudiologyDetails,
        AudiogramPoint,
        Ear,
        TympanogramType,
        DermatologyDetails,
        Lesion,
        NeurologyDetails,
        EegResult,
        CardiologyDetails,
        DentalDetails,
        DentalProcedure,
        OphthalmologyDetails,
        PhysiotherapyDetails,
        VisitSummary,
        SpecialtyMetrics,
        EarSummary,
        HearingLossGrade,
        BloodPressureCategory,
        GcsSeverity,
        Prescription,
        PrescriptionStatus,
        NewPrescription,
        clinical::PrescriptionStatusBody,
        Diagnosis,
        DiagnosisStatus,
        NewDiagnosis,
        ResolveDiagnosis,
        Invoice,
        InvoiceStatus,
        InvoiceTotals,
        LineItem,
        NewLineItem,
        NewInvoice,
        Payment,
        PaymentMethod,
        NewPayment,
        OutstandingBalance,
        InventoryItem,
        InventoryCategory,
        StockMovement,
        NewInventoryItem,
        StockAdjustment,
        Employee,
        EmployeeRole,
        EmployeeStatus,
        NewEmployee,
        Termination,
        employees::EmployeeStatusBody,
        Campaign,
        CampaignChannel,
        CampaignStatus,
        NewCampaign,
        CampaignStats,
        crm::CampaignStatusBody,
        Lead,
        LeadStatus,
        NewLead,
        ConvertLead,
        LeadConversion,
        crm::LeadStatusBody,
    )),
    tags(
        (name = "clinic", description = "Clinic EMR REST API")
    )
)]
pub struct ApiDoc;
