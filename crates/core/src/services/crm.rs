//! Marketing campaigns and the leads they bring in.

use super::PatientService;
use crate::models::{
    Campaign, CampaignStats, CampaignStatus, ConvertLead, Lead, LeadFilter, LeadStatus,
    NewCampaign, NewLead, NewPatient, Patient,
};
use crate::store::Stores;
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::Utc;
use clinic_uuid::RecordId;
use serde::Serialize;

/// A converted lead and the patient created from it.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadConversion {
    pub lead: Lead,
    pub patient: Patient,
}

#[derive(Clone)]
pub struct CrmService {
    stores: Stores,
    patients: PatientService,
}

impl CrmService {
    pub fn new(stores: Stores, patients: PatientService) -> Self {
        Self { stores, patients }
    }

    // ===== CAMPAIGNS =====

    pub fn create_campaign(&self, scope: &TenantScope, input: NewCampaign) -> ClinicResult<Campaign> {
        let campaign = input.into_campaign(scope.tenant_id().clone(), Utc::now())?;
        self.stores.campaigns.insert(campaign.clone())?;
        tracing::info!(
            "created {:?} campaign {} ({})",
            campaign.channel,
            campaign.id,
            campaign.name
        );
        Ok(campaign)
    }

    pub fn get_campaign(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<Campaign> {
        scope.fetch(self.stores.campaigns.as_ref(), id)
    }

    /// Campaigns, most recent start date first.
    pub fn list_campaigns(&self, scope: &TenantScope) -> ClinicResult<Vec<Campaign>> {
        let mut campaigns = scope.list(self.stores.campaigns.as_ref())?;
        campaigns.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(campaigns)
    }

    pub fn update_campaign_status(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        status: CampaignStatus,
    ) -> ClinicResult<Campaign> {
        let _guard = self.stores.write_guard()?;
        let mut campaign = self.get_campaign(scope, id)?;
        if !campaign.status.can_transition_to(status) {
            return Err(ClinicError::Conflict(format!(
                "campaign cannot move from {:?} to {:?}",
                campaign.status, status
            )));
        }
        campaign.status = status;
        campaign.updated_at = Utc::now();
        self.stores.campaigns.update(campaign.clone())?;
        tracing::info!("campaign {} is now {:?}", id, status);
        Ok(campaign)
    }

    pub fn campaign_stats(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<CampaignStats> {
        let campaign = self.get_campaign(scope, id)?;
        let leads: Vec<Lead> = scope
            .list(self.stores.leads.as_ref())?
            .into_iter()
            .filter(|l| l.campaign_id == Some(campaign.id))
            .collect();
        Ok(CampaignStats::compute(&campaign, &leads))
    }

    // ===== LEADS =====

    /// Records a lead. A lead needs an email address or a phone number.
    pub fn create_lead(&self, scope: &TenantScope, input: NewLead) -> ClinicResult<Lead> {
        if let Some(campaign_id) = &input.campaign_id {
            self.get_campaign(scope, campaign_id)?;
        }
        let lead = input.into_lead(scope.tenant_id().clone(), Utc::now())?;
        self.stores.leads.insert(lead.clone())?;
        tracing::info!("recorded lead {} from {}", lead.id, lead.source);
        Ok(lead)
    }

    pub fn get_lead(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<Lead> {
        scope.fetch(self.stores.leads.as_ref(), id)
    }

    /// Leads matching `filter`, newest first.
    pub fn list_leads(&self, scope: &TenantScope, filter: &LeadFilter) -> ClinicResult<Vec<Lead>> {
        let mut leads: Vec<Lead> = scope
            .list(self.stores.leads.as_ref())?
            .into_iter()
            .filter(|l| filter.matches(l))
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    /// Moves a lead through the pipeline. Conversion has its own operation because it creates
    /// a patient.
    pub fn update_lead_status(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        status: LeadStatus,
    ) -> ClinicResult<Lead> {
        if status == LeadStatus::Converted {
            return Err(ClinicError::invalid(
                "status",
                "use the convert operation to convert a lead",
            ));
        }
        let _guard = self.stores.write_guard()?;
        let mut lead = self.get_lead(scope, id)?;
        if lead.status == LeadStatus::Converted {
            return Err(ClinicError::Conflict(format!(
                "lead {id} is already converted"
            )));
        }
        lead.status = status;
        lead.updated_at = Utc::now();
        self.stores.leads.update(lead.clone())?;
        tracing::info!("lead {} is now {:?}", id, status);
        Ok(lead)
    }

    /// Creates a patient from the lead and marks the lead Converted.
    ///
    /// The patient insert and the lead update happen under one write lock, so a lead is
    /// converted at most once.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the lead is already converted
    /// - `Validation` if the lead's details do not make a valid patient
    pub fn convert_lead(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        input: ConvertLead,
    ) -> ClinicResult<LeadConversion> {
        let guard = self.stores.write_guard()?;
        let mut lead = self.get_lead(scope, id)?;
        if lead.status == LeadStatus::Converted {
            return Err(ClinicError::Conflict(format!(
                "lead {id} is already converted"
            )));
        }

        let now = Utc::now();
        let patient = NewPatient {
            first_name: lead.first_name.as_str().to_string(),
            last_name: lead.last_name.as_str().to_string(),
            date_of_birth: input.date_of_birth,
            sex: input.sex,
            email: lead.email.as_ref().map(|e| e.as_str().to_string()),
            phone: lead.phone.as_ref().map(|p| p.as_str().to_string()),
            national_id: None,
            address: None,
            allergies: Vec::new(),
            notes: lead.notes.clone(),
        }
        .into_patient(scope.tenant_id().clone(), now)?;
        let patient = self.patients.insert_locked(&guard, scope, patient)?;

        lead.status = LeadStatus::Converted;
        lead.patient_id = Some(patient.id);
        lead.updated_at = now;
        self.stores.leads.update(lead.clone())?;
        tracing::info!("converted lead {} into patient {}", id, patient.id);
        Ok(LeadConversion { lead, patient })
    }
}
