//! Tenant and branch scoping.
//!
//! Every service call carries a [`TenantScope`]. Records are always filtered to the scope's
//! tenant; when the scope also names a branch, lists are narrowed to that branch as well.

use crate::store::{Record, Store};
use crate::{ClinicError, ClinicResult};
use clinic_types::TenantId;
use clinic_uuid::RecordId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    tenant_id: TenantId,
    branch_id: Option<RecordId>,
}

impl TenantScope {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            branch_id: None,
        }
    }

    pub fn with_branch(mut self, branch_id: RecordId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn branch_id(&self) -> Option<RecordId> {
        self.branch_id
    }

    /// Resolves the branch for a new branch-scoped record.
    ///
    /// An explicit branch in the input wins, otherwise the scope's branch is used. If both are
    /// present they must agree.
    pub fn resolve_branch(&self, requested: Option<RecordId>) -> ClinicResult<RecordId> {
        match (requested, self.branch_id) {
            (Some(req), Some(scoped)) if req != scoped => Err(ClinicError::Forbidden(format!(
                "branch {req} is outside the current branch scope"
            ))),
            (Some(req), _) => Ok(req),
            (None, Some(scoped)) => Ok(scoped),
            (None, None) => Err(ClinicError::invalid("branchId", "branch is required")),
        }
    }

    /// True if `record` is visible in lists for this scope.
    pub fn includes<T: Record>(&self, record: &T) -> bool {
        if record.tenant_id() != &self.tenant_id || record.is_deleted() {
            return false;
        }
        match (self.branch_id, record.branch_id()) {
            (Some(scoped), Some(branch)) => scoped == branch,
            _ => true,
        }
    }

    /// Loads a record by id, enforcing tenant isolation.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the id is unknown or the record is soft-deleted
    /// - `TenantIsolationViolation` if the record belongs to another tenant
    pub fn fetch<T: Record>(&self, store: &dyn Store<T>, id: &RecordId) -> ClinicResult<T> {
        let record = store
            .get(id)?
            .ok_or_else(|| ClinicError::not_found(T::KIND, id))?;

        if record.tenant_id() != &self.tenant_id {
            tracing::warn!(
                "tenant {} attempted to access {} {} of another tenant",
                self.tenant_id,
                T::KIND,
                id
            );
            return Err(ClinicError::TenantIsolationViolation {
                entity: T::KIND,
                id: id.to_string(),
            });
        }

        if record.is_deleted() {
            return Err(ClinicError::not_found(T::KIND, id));
        }

        Ok(record)
    }

    /// Lists every record visible in this scope, in store order.
    pub fn list<T: Record>(&self, store: &dyn Store<T>) -> ClinicResult<Vec<T>> {
        Ok(store
            .list()?
            .into_iter()
            .filter(|r| self.includes(r))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Utc};

    #[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
    struct Widget {
        id: RecordId,
        tenant_id: TenantId,
        branch_id: Option<RecordId>,
        deleted_at: Option<DateTime<Utc>>,
    }

    impl Record for Widget {
        const KIND: &'static str = "widget";

        fn id(&self) -> RecordId {
            self.id
        }

        fn tenant_id(&self) -> &TenantId {
            &self.tenant_id
        }

        fn branch_id(&self) -> Option<RecordId> {
            self.branch_id
        }

        fn deleted_at(&self) -> Option<DateTime<Utc>> {
            self.deleted_at
        }
    }

    fn widget(tenant: &str, branch: Option<RecordId>) -> Widget {
        Widget {
            id: RecordId::new(),
            tenant_id: TenantId::new(tenant).unwrap(),
            branch_id: branch,
            deleted_at: None,
        }
    }

    #[test]
    fn fetch_rejects_other_tenant() {
        let store = MemoryStore::<Widget>::new();
        let theirs = widget("other", None);
        store.insert(theirs.clone()).unwrap();

        let scope = TenantScope::new(TenantId::new("mine").unwrap());
        let err = scope.fetch(&store, &theirs.id).unwrap_err();
        assert!(matches!(err, ClinicError::TenantIsolationViolation { .. }));
    }

    #[test]
    fn fetch_hides_soft_deleted() {
        let store = MemoryStore::<Widget>::new();
        let mut w = widget("mine", None);
        w.deleted_at = Some(Utc::now());
        store.insert(w.clone()).unwrap();

        let scope = TenantScope::new(TenantId::new("mine").unwrap());
        assert!(matches!(
            scope.fetch(&store, &w.id),
            Err(ClinicError::NotFound { .. })
        ));
    }

    #[test]
    fn list_filters_tenant_and_branch() {
        let store = MemoryStore::<Widget>::new();
        let branch_a = RecordId::new();
        let branch_b = RecordId::new();
        store.insert(widget("mine", Some(branch_a))).unwrap();
        store.insert(widget("mine", Some(branch_b))).unwrap();
        store.insert(widget("mine", None)).unwrap();
        store.insert(widget("other", Some(branch_a))).unwrap();

        let tenant_scope = TenantScope::new(TenantId::new("mine").unwrap());
        assert_eq!(tenant_scope.list(&store).unwrap().len(), 3);

        let branch_scope = tenant_scope.with_branch(branch_a);
        assert_eq!(branch_scope.list(&store).unwrap().len(), 2);
    }

    #[test]
    fn resolve_branch_rules() {
        let a = RecordId::new();
        let b = RecordId::new();
        let scope = TenantScope::new(TenantId::new("mine").unwrap());
        assert!(matches!(
            scope.resolve_branch(None),
            Err(ClinicError::Validation(_))
        ));
        assert_eq!(scope.resolve_branch(Some(a)).unwrap(), a);

        let scoped = scope.with_branch(a);
        assert_eq!(scoped.resolve_branch(None).unwrap(), a);
        assert!(matches!(
            scoped.resolve_branch(Some(b)),
            Err(ClinicError::Forbidden(_))
        ));
    }
}
