use super::notes_field;
use crate::store::Record;
use crate::validation::{Validate, Validator};
use crate::ClinicResult;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::TenantId;
use clinic_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Declaration order is service order: `Urgent` entries are offered first.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
pub enum WaitlistPriority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum WaitlistStatus {
    Waiting,
    Offered,
    Booked,
    Cancelled,
}

impl WaitlistStatus {
    pub fn is_open(self) -> bool {
        matches!(self, WaitlistStatus::Waiting | WaitlistStatus::Offered)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub branch_id: RecordId,
    pub patient_id: RecordId,
    pub provider_id: Option<RecordId>,
    pub priority: WaitlistPriority,
    pub preferred_from: Option<NaiveDate>,
    pub preferred_to: Option<NaiveDate>,
    pub status: WaitlistStatus,
    pub notes: Option<String>,
    pub appointment_id: Option<RecordId>,
    pub offered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for WaitlistEntry {
    const KIND: &'static str = "waitlist_entry";

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
pub struct NewWaitlistEntry {
    pub branch_id: Option<RecordId>,
    pub patient_id: RecordId,
    pub provider_id: Option<RecordId>,
    #[serde(default)]
    pub priority: WaitlistPriority,
    pub preferred_from: Option<NaiveDate>,
    pub preferred_to: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Validate for NewWaitlistEntry {
    fn collect_errors(&self, v: &mut Validator) {
        self.check_window(v);
        notes_field(v, "notes", self.notes.as_deref());
    }
}

impl NewWaitlistEntry {
    fn check_window(&self, v: &mut Validator) {
        if let (Some(from), Some(to)) = (self.preferred_from, self.preferred_to) {
            v.check(to >= from, "preferredTo", "must not be before preferredFrom");
        }
    }

    pub(crate) fn into_entry(
        self,
        tenant_id: TenantId,
        branch_id: RecordId,
        now: DateTime<Utc>,
    ) -> ClinicResult<WaitlistEntry> {
        let mut v = Validator::new();
        self.check_window(&mut v);
        let notes = notes_field(&mut v, "notes", self.notes.as_deref());
        v.finish_with(|| {
            Some(WaitlistEntry {
                id: RecordId::new(),
                tenant_id,
                branch_id,
                patient_id: self.patient_id,
                provider_id: self.provider_id,
                priority: self.priority,
                preferred_from: self.preferred_from,
                preferred_to: self.preferred_to,
                status: WaitlistStatus::Waiting,
                notes: notes?,
                appointment_id: None,
                offered_at: None,
                created_at: now,
                updated_at: now,
            })
        })
    }
}
