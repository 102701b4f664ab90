use crate::constants::MAX_NAME_LEN;
use crate::store::Record;
use crate::validation::{Validate, Validator};
use crate::ClinicResult;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::{EmailAddress, NonEmptyText, TenantId};
use clinic_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum EmployeeRole {
    Doctor,
    Nurse,
    Audiologist,
    Dentist,
    Physiotherapist,
    Receptionist,
    Admin,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum EmployeeStatus {
    Active,
    OnLeave,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub branch_id: RecordId,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    pub email: EmailAddress,
    pub role: EmployeeRole,
    pub department: Option<NonEmptyText>,
    pub hire_date: NaiveDate,
    pub status: EmployeeStatus,
    pub termination_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Employee {
    const KIND: &'static str = "employee";

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
pub struct NewEmployee {
    pub branch_id: Option<RecordId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: EmployeeRole,
    pub department: Option<String>,
    pub hire_date: NaiveDate,
}

type EmployeeParts = (
    NonEmptyText,
    NonEmptyText,
    EmailAddress,
    Option<NonEmptyText>,
);

impl NewEmployee {
    fn check(&self, v: &mut Validator) -> Option<EmployeeParts> {
        let first_name = v.text("firstName", &self.first_name, MAX_NAME_LEN);
        let last_name = v.text("lastName", &self.last_name, MAX_NAME_LEN);
        let email = match EmailAddress::parse(&self.email) {
            Ok(email) => Some(email),
            Err(e) => {
                v.error("email", e.to_string());
                None
            }
        };
        let department = v.optional_text("department", self.department.as_deref(), MAX_NAME_LEN);
        let latest = Utc::now().date_naive() + chrono::Duration::days(365);
        v.date_between("hireDate", self.hire_date, super::earliest_date(), latest);
        Some((first_name?, last_name?, email?, department?))
    }

    pub(crate) fn into_employee(
        self,
        tenant_id: TenantId,
        branch_id: RecordId,
        now: DateTime<Utc>,
    ) -> ClinicResult<Employee> {
        let mut v = Validator::new();
        let parts = self.check(&mut v);
        v.finish_with(|| {
            let (first_name, last_name, email, department) = parts?;
            Some(Employee {
                id: RecordId::new(),
                tenant_id,
                branch_id,
                first_name,
                last_name,
                email,
                role: self.role,
                department,
                hire_date: self.hire_date,
                status: EmployeeStatus::Active,
                termination_date: None,
                created_at: now,
                updated_at: now,
            })
        })
    }
}

impl Validate for NewEmployee {
    fn collect_errors(&self, v: &mut Validator) {
        let _ = self.check(v);
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Termination {
    pub termination_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EmployeeFilter {
    #[param(value_type = Option<String>)]
    pub role: Option<EmployeeRole>,
    #[param(value_type = Option<String>)]
    pub status: Option<EmployeeStatus>,
}

impl EmployeeFilter {
    pub fn matches(&self, e: &Employee) -> bool {
        self.role.map_or(true, |r| e.role == r) && self.status.map_or(true, |s| e.status == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_valid_email() {
        let input = NewEmployee {
            branch_id: None,
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            email: "ana-at-clinic".into(),
            role: EmployeeRole::Audiologist,
            department: None,
            hire_date: NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
        };
        let err = input.validate().unwrap_err();
        assert!(err.field_errors().unwrap().get("email").is_some());
    }

    #[test]
    fn filter_by_role_and_status() {
        let employee = NewEmployee {
            branch_id: None,
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            email: "ana@clinic.example".into(),
            role: EmployeeRole::Audiologist,
            department: Some("ENT".into()),
            hire_date: NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
        }
        .into_employee(TenantId::new("acme").unwrap(), RecordId::new(), Utc::now())
        .unwrap();

        assert!(EmployeeFilter::default().matches(&employee));
        assert!(EmployeeFilter {
            role: Some(EmployeeRole::Audiologist),
            status: Some(EmployeeStatus::Active),
        }
        .matches(&employee));
        assert!(!EmployeeFilter {
            role: Some(EmployeeRole::Nurse),
            status: None,
        }
        .matches(&employee));
    }
}
