//! Marketing campaigns and the leads they generate.

use super::notes_field;
use crate::constants::{MAX_NAME_LEN, MAX_SHORT_TEXT_LEN};
use crate::models::Sex;
use crate::store::Record;
use crate::validation::{Validate, Validator};
use crate::ClinicResult;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::{EmailAddress, NonEmptyText, PhoneNumber, TenantId};
use clinic_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum CampaignChannel {
    Email,
    Sms,
    Social,
    Referral,
    Event,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum CampaignStatus {
    Planned,
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Planned, Active | Completed)
                | (Active, Paused | Completed)
                | (Paused, Active | Completed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub name: NonEmptyText,
    pub channel: CampaignChannel,
    pub budget_cents: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Campaign {
    const KIND: &'static str = "campaign";

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub name: String,
    pub channel: CampaignChannel,
    #[serde(default)]
    pub budget_cents: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl NewCampaign {
    fn check(&self, v: &mut Validator) -> Option<NonEmptyText> {
        let name = v.text("name", &self.name, MAX_NAME_LEN);
        v.check(self.budget_cents >= 0, "budgetCents", "must not be negative");
        if let Some(end) = self.end_date {
            v.check(end >= self.start_date, "endDate", "must not be before startDate");
        }
        name
    }

    pub(crate) fn into_campaign(
        self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> ClinicResult<Campaign> {
        let mut v = Validator::new();
        let name = self.check(&mut v);
        v.finish_with(|| {
            Some(Campaign {
                id: RecordId::new(),
                tenant_id,
                name: name?,
                channel: self.channel,
                budget_cents: self.budget_cents,
                start_date: self.start_date,
                end_date: self.end_date,
                status: CampaignStatus::Planned,
                created_at: now,
                updated_at: now,
            })
        })
    }
}

impl Validate for NewCampaign {
    fn collect_errors(&self, v: &mut Validator) {
        let _ = self.check(v);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStats {
    pub campaign_id: RecordId,
    pub lead_count: usize,
    pub converted_count: usize,
    /// Converted leads over all leads, 0.0 when there are none
    pub conversion_rate: f64,
    /// Budget divided by lead count, rounded half up; absent when there are no leads
    pub cost_per_lead_cents: Option<i64>,
}

impl CampaignStats {
    pub fn compute(campaign: &Campaign, leads: &[Lead]) -> Self {
        let lead_count = leads.len();
        let converted_count = leads
            .iter()
            .filter(|l| l.status == LeadStatus::Converted)
            .count();
        let conversion_rate = if lead_count == 0 {
            0.0
        } else {
            converted_count as f64 / lead_count as f64
        };
        let cost_per_lead_cents = (lead_count > 0).then(|| {
            let n = lead_count as i64;
            (2 * campaign.budget_cents + n) / (2 * n)
        });
        Self {
            campaign_id: campaign.id,
            lead_count,
            converted_count,
            conversion_rate,
            cost_per_lead_cents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub campaign_id: Option<RecordId>,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub source: NonEmptyText,
    pub status: LeadStatus,
    pub patient_id: Option<RecordId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Lead {
    const KIND: &'static str = "lead";

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub campaign_id: Option<RecordId>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
    pub notes: Option<String>,
}

struct LeadParts {
    first_name: NonEmptyText,
    last_name: NonEmptyText,
    email: Option<EmailAddress>,
    phone: Option<PhoneNumber>,
    source: NonEmptyText,
    notes: Option<String>,
}

impl NewLead {
    fn check(&self, v: &mut Validator) -> Option<LeadParts> {
        let first_name = v.text("firstName", &self.first_name, MAX_NAME_LEN);
        let last_name = v.text("lastName", &self.last_name, MAX_NAME_LEN);
        let email = v.optional_email("email", self.email.as_deref());
        let phone = v.optional_phone("phone", self.phone.as_deref());
        if matches!((&email, &phone), (Some(None), Some(None))) {
            v.error("email", "email or phone is required");
        }
        let source = v.text("source", &self.source, MAX_SHORT_TEXT_LEN);
        let notes = notes_field(v, "notes", self.notes.as_deref());
        Some(LeadParts {
            first_name: first_name?,
            last_name: last_name?,
            email: email?,
            phone: phone?,
            source: source?,
            notes: notes?,
        })
    }

    pub(crate) fn into_lead(self, tenant_id: TenantId, now: DateTime<Utc>) -> ClinicResult<Lead> {
        let mut v = Validator::new();
        let parts = self.check(&mut v);
        v.finish_with(|| {
            let parts = parts?;
            Some(Lead {
                id: RecordId::new(),
                tenant_id,
                campaign_id: self.campaign_id,
                first_name: parts.first_name,
                last_name: parts.last_name,
                email: parts.email,
                phone: parts.phone,
                source: parts.source,
                status: LeadStatus::New,
                patient_id: None,
                notes: parts.notes,
                created_at: now,
                updated_at: now,
            })
        })
    }
}

impl Validate for NewLead {
    fn collect_errors(&self, v: &mut Validator) {
        let _ = self.check(v);
    }
}

/// Details a lead lacks that a patient record needs.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLead {
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub sex: Sex,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeadFilter {
    #[param(value_type = Option<String>)]
    pub status: Option<LeadStatus>,
    #[param(value_type = Option<String>)]
    pub campaign_id: Option<RecordId>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        self.status.map_or(true, |s| lead.status == s)
            && self.campaign_id.map_or(true, |c| lead.campaign_id == Some(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(budget_cents: i64) -> Campaign {
        NewCampaign {
            name: "Spring hearing checks".into(),
            channel: CampaignChannel::Social,
            budget_cents,
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: None,
        }
        .into_campaign(TenantId::new("acme").unwrap(), Utc::now())
        .unwrap()
    }

    fn lead(status: LeadStatus) -> Lead {
        let mut lead = NewLead {
            campaign_id: None,
            first_name: "Li".into(),
            last_name: "Wei".into(),
            email: Some("li@example.com".into()),
            phone: None,
            source: "instagram".into(),
            notes: None,
        }
        .into_lead(TenantId::new("acme").unwrap(), Utc::now())
        .unwrap();
        lead.status = status;
        lead
    }

    #[test]
    fn lead_needs_a_contact_route() {
        let input = NewLead {
            campaign_id: None,
            first_name: "Li".into(),
            last_name: "Wei".into(),
            email: None,
            phone: Some("  ".into()),
            source: "walk-in".into(),
            notes: None,
        };
        let err = input.validate().unwrap_err();
        assert!(err.field_errors().unwrap().get("email").is_some());
    }

    #[test]
    fn stats_with_and_without_leads() {
        let c = campaign(10_000);
        let empty = CampaignStats::compute(&c, &[]);
        assert_eq!(empty.conversion_rate, 0.0);
        assert_eq!(empty.cost_per_lead_cents, None);

        let leads = vec![
            lead(LeadStatus::Converted),
            lead(LeadStatus::New),
            lead(LeadStatus::Lost),
        ];
        let stats = CampaignStats::compute(&c, &leads);
        assert_eq!(stats.lead_count, 3);
        assert_eq!(stats.converted_count, 1);
        assert!((stats.conversion_rate - 1.0 / 3.0).abs() < 1e-12);
        // 10000 / 3 = 3333.33 -> 3333
        assert_eq!(stats.cost_per_lead_cents, Some(3333));
    }

    #[test]
    fn campaign_status_machine() {
        use CampaignStatus::*;
        assert!(Planned.can_transition_to(Active));
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Active.can_transition_to(Planned));
    }
}
