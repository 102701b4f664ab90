use super::{earliest_date, notes_field};
use crate::constants::{MAX_NAME_LEN, MAX_SHORT_TEXT_LEN};
use crate::store::Record;
use crate::validation::{Validate, Validator};
use crate::ClinicResult;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clinic_types::{EmailAddress, NonEmptyText, PhoneNumber, TenantId};
use clinic_uuid::RecordId;
use serde::{Deserialize, Serialize};

const MAX_ALLERGIES: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Sex {
    Male,
    Female,
    Other,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub national_id: Option<NonEmptyText>,
    pub address: Option<NonEmptyText>,
    #[serde(default)]
    pub allergies: Vec<NonEmptyText>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `on`.
    pub fn age_on(&self, on: NaiveDate) -> u32 {
        let mut years = on.year() - self.date_of_birth.year();
        if (on.month(), on.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            years -= 1;
        }
        years.max(0) as u32
    }

    /// Case-insensitive match against names, contact details and national id.
    pub(crate) fn matches(&self, needle_lower: &str) -> bool {
        if needle_lower.is_empty() {
            return true;
        }
        let full = self.full_name().to_lowercase();
        let digits: String = needle_lower.chars().filter(char::is_ascii_digit).collect();

        full.contains(needle_lower)
            || self
                .email
                .as_ref()
                .is_some_and(|e| e.as_str().contains(needle_lower))
            || self
                .national_id
                .as_ref()
                .is_some_and(|n| n.as_str().to_lowercase().contains(needle_lower))
            || (digits.len() >= 3
                && self
                    .phone
                    .as_ref()
                    .is_some_and(|p| p.as_str().contains(&digits)))
    }
}

impl Record for Patient {
    const KIND: &'static str = "patient";

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub notes: Option<String>,
}

fn check_date_of_birth(v: &mut Validator, dob: NaiveDate) {
    v.date_between(
        "dateOfBirth",
        dob,
        earliest_date(),
        Utc::now().date_naive(),
    );
}

fn check_allergies(v: &mut Validator, allergies: &[String]) -> Option<Vec<NonEmptyText>> {
    v.check(
        allergies.len() <= MAX_ALLERGIES,
        "allergies",
        format!("at most {MAX_ALLERGIES} allergies"),
    );
    let mut out = Vec::with_capacity(allergies.len());
    let mut ok = true;
    for (i, allergy) in allergies.iter().enumerate() {
        match v.text(&format!("allergies[{i}]"), allergy, MAX_SHORT_TEXT_LEN) {
            Some(a) => out.push(a),
            None => ok = false,
        }
    }
    ok.then_some(out)
}

impl NewPatient {
    pub(crate) fn into_patient(
        self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> ClinicResult<Patient> {
        let mut v = Validator::new();
        let first_name = v.text("firstName", &self.first_name, MAX_NAME_LEN);
        let last_name = v.text("lastName", &self.last_name, MAX_NAME_LEN);
        check_date_of_birth(&mut v, self.date_of_birth);
        let email = v.optional_email("email", self.email.as_deref());
        let phone = v.optional_phone("phone", self.phone.as_deref());
        let national_id =
            v.optional_text("nationalId", self.national_id.as_deref(), MAX_NAME_LEN);
        let address = v.optional_text("address", self.address.as_deref(), MAX_SHORT_TEXT_LEN);
        let allergies = check_allergies(&mut v, &self.allergies);
        let notes = notes_field(&mut v, "notes", self.notes.as_deref());

        v.finish_with(|| {
            Some(Patient {
                id: RecordId::new(),
                tenant_id,
                first_name: first_name?,
                last_name: last_name?,
                date_of_birth: self.date_of_birth,
                sex: self.sex,
                email: email?,
                phone: phone?,
                national_id: national_id?,
                address: address?,
                allergies: allergies?,
                notes: notes?,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
        })
    }
}

impl Validate for NewPatient {
    fn collect_errors(&self, v: &mut Validator) {
        v.text("firstName", &self.first_name, MAX_NAME_LEN);
        v.text("lastName", &self.last_name, MAX_NAME_LEN);
        check_date_of_birth(v, self.date_of_birth);
        v.optional_email("email", self.email.as_deref());
        v.optional_phone("phone", self.phone.as_deref());
        v.optional_text("nationalId", self.national_id.as_deref(), MAX_NAME_LEN);
        v.optional_text("address", self.address.as_deref(), MAX_SHORT_TEXT_LEN);
        check_allergies(v, &self.allergies);
        notes_field(v, "notes", self.notes.as_deref());
    }
}

/// Partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatient {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl UpdatePatient {
    /// Applies the update to a copy of `patient`.
    pub(crate) fn apply(self, patient: &Patient, now: DateTime<Utc>) -> ClinicResult<Patient> {
        let mut v = Validator::new();
        let first_name = self
            .first_name
            .as_deref()
            .map(|s| v.text("firstName", s, MAX_NAME_LEN));
        let last_name = self
            .last_name
            .as_deref()
            .map(|s| v.text("lastName", s, MAX_NAME_LEN));
        if let Some(dob) = self.date_of_birth {
            check_date_of_birth(&mut v, dob);
        }
        let email = self
            .email
            .as_deref()
            .map(|s| v.optional_email("email", Some(s)));
        let phone = self
            .phone
            .as_deref()
            .map(|s| v.optional_phone("phone", Some(s)));
        let national_id = self
            .national_id
            .as_deref()
            .map(|s| v.optional_text("nationalId", Some(s), MAX_NAME_LEN));
        let address = self
            .address
            .as_deref()
            .map(|s| v.optional_text("address", Some(s), MAX_SHORT_TEXT_LEN));
        let allergies = self.allergies.as_deref().map(|a| check_allergies(&mut v, a));
        let notes = self
            .notes
            .as_deref()
            .map(|s| notes_field(&mut v, "notes", Some(s)));

        v.finish_with(|| {
            let mut updated = patient.clone();
            if let Some(first_name) = first_name {
                updated.first_name = first_name?;
            }
            if let Some(last_name) = last_name {
                updated.last_name = last_name?;
            }
            if let Some(dob) = self.date_of_birth {
                updated.date_of_birth = dob;
            }
            if let Some(sex) = self.sex {
                updated.sex = sex;
            }
            if let Some(email) = email {
                updated.email = email?;
            }
            if let Some(phone) = phone {
                updated.phone = phone?;
            }
            if let Some(national_id) = national_id {
                updated.national_id = national_id?;
            }
            if let Some(address) = address {
                updated.address = address?;
            }
            if let Some(allergies) = allergies {
                updated.allergies = allergies?;
            }
            if let Some(notes) = notes {
                updated.notes = notes?;
            }
            updated.updated_at = now;
            Some(updated)
        })
    }
}
