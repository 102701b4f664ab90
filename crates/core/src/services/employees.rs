use crate::models::{Employee, EmployeeFilter, EmployeeStatus, NewEmployee, Termination};
use crate::store::Stores;
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::Utc;
use clinic_uuid::RecordId;

#[derive(Clone)]
pub struct EmployeeService {
    stores: Stores,
}

impl EmployeeService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Hires an employee. Email addresses are unique within a tenant.
    pub fn create(&self, scope: &TenantScope, input: NewEmployee) -> ClinicResult<Employee> {
        let branch_id = scope.resolve_branch(input.branch_id)?;
        let employee = input.into_employee(scope.tenant_id().clone(), branch_id, Utc::now())?;

        let _guard = self.stores.write_guard()?;
        let taken = self
            .stores
            .employees
            .list()?
            .iter()
            .any(|e| e.tenant_id == employee.tenant_id && e.email == employee.email);
        if taken {
            return Err(ClinicError::Conflict(format!(
                "an employee with email {} already exists",
                employee.email.as_str()
            )));
        }
        self.stores.employees.insert(employee.clone())?;
        tracing::info!(
            "hired employee {} as {:?}",
            employee.id,
            employee.role
        );
        Ok(employee)
    }

    pub fn get(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<Employee> {
        scope.fetch(self.stores.employees.as_ref(), id)
    }

    pub fn list(&self, scope: &TenantScope, filter: &EmployeeFilter) -> ClinicResult<Vec<Employee>> {
        let mut found: Vec<Employee> = scope
            .list(self.stores.employees.as_ref())?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        found.sort_by(|a, b| {
            let key = |e: &Employee| {
                (
                    e.last_name.as_str().to_lowercase(),
                    e.first_name.as_str().to_lowercase(),
                )
            };
            key(a).cmp(&key(b))
        });
        Ok(found)
    }

    /// Moves an employee between Active and OnLeave. Termination goes through
    /// [`terminate`](Self::terminate) because it needs a date.
    pub fn update_status(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        status: EmployeeStatus,
    ) -> ClinicResult<Employee> {
        if status == EmployeeStatus::Terminated {
            return Err(ClinicError::invalid(
                "status",
                "use terminate to end employment",
            ));
        }
        let _guard = self.stores.write_guard()?;
        let mut employee = self.get(scope, id)?;
        if employee.status == EmployeeStatus::Terminated {
            return Err(ClinicError::Conflict(format!(
                "employee {id} is terminated"
            )));
        }
        employee.status = status;
        employee.updated_at = Utc::now();
        self.stores.employees.update(employee.clone())?;
        tracing::info!("employee {} is now {:?}", id, status);
        Ok(employee)
    }

    pub fn terminate(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        input: Termination,
    ) -> ClinicResult<Employee> {
        let _guard = self.stores.write_guard()?;
        let mut employee = self.get(scope, id)?;
        if employee.status == EmployeeStatus::Terminated {
            return Err(ClinicError::Conflict(format!(
                "employee {id} is already terminated"
            )));
        }
        if input.termination_date < employee.hire_date {
            return Err(ClinicError::invalid(
                "terminationDate",
                format!("must not be before the hire date {}", employee.hire_date),
            ));
        }
        employee.status = EmployeeStatus::Terminated;
        employee.termination_date = Some(input.termination_date);
        employee.updated_at = Utc::now();
        self.stores.employees.update(employee.clone())?;
        tracing::info!(
            "terminated employee {} effective {}",
            id,
            input.termination_date
        );
        Ok(employee)
    }
}
