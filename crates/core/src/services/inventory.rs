use crate::models::{InventoryItem, NewInventoryItem, StockAdjustment};
use crate::pagination::{Page, PageRequest};
use crate::store::Stores;
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::{Duration, Utc};
use clinic_uuid::RecordId;

/// Longest look-ahead accepted by [`InventoryService::expiring_within`].
pub const MAX_EXPIRY_WINDOW_DAYS: i64 = 3650;

#[derive(Clone)]
pub struct InventoryService {
    stores: Stores,
}

impl InventoryService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Adds a stock item. SKUs are unique within a tenant's branch.
    pub fn create(&self, scope: &TenantScope, input: NewInventoryItem) -> ClinicResult<InventoryItem> {
        let branch_id = scope.resolve_branch(input.branch_id)?;
        let item = input.into_item(scope.tenant_id().clone(), branch_id, Utc::now())?;

        let _guard = self.stores.write_guard()?;
        let taken = self.stores.inventory.list()?.into_iter().any(|other| {
            other.tenant_id == item.tenant_id
                && other.branch_id == item.branch_id
                && other.sku == item.sku
                && other.deleted_at.is_none()
        });
        if taken {
            return Err(ClinicError::Conflict(format!(
                "sku {} already exists in this branch",
                item.sku
            )));
        }
        self.stores.inventory.insert(item.clone())?;
        tracing::info!(
            "added inventory item {} ({}) with {} in stock",
            item.sku,
            item.id,
            item.quantity
        );
        Ok(item)
    }

    pub fn get(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<InventoryItem> {
        scope.fetch(self.stores.inventory.as_ref(), id)
    }

    pub fn list(&self, scope: &TenantScope, page: &PageRequest) -> ClinicResult<Page<InventoryItem>> {
        let mut items = scope.list(self.stores.inventory.as_ref())?;
        items.sort_by(|a, b| {
            a.name
                .as_str()
                .to_lowercase()
                .cmp(&b.name.as_str().to_lowercase())
                .then_with(|| a.sku.cmp(&b.sku))
        });
        Ok(Page::from_vec(items, page))
    }

    /// Receives (positive delta) or dispenses (negative delta) stock.
    ///
    /// # Errors
    ///
    /// `Conflict` if the quantity would drop below zero.
    pub fn adjust_stock(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        adjustment: StockAdjustment,
    ) -> ClinicResult<InventoryItem> {
        let reason = adjustment.checked_reason()?;
        let _guard = self.stores.write_guard()?;
        let mut item = self.get(scope, id)?;
        let available = item.quantity;
        if item
            .apply_adjustment(adjustment.delta, reason, Utc::now())
            .is_none()
        {
            return Err(ClinicError::Conflict(format!(
                "cannot adjust {} by {}: {} in stock",
                item.sku, adjustment.delta, available
            )));
        }
        self.stores.inventory.update(item.clone())?;
        tracing::info!(
            "adjusted {} by {} to {}",
            item.sku,
            adjustment.delta,
            item.quantity
        );
        if item.is_low_stock() {
            tracing::warn!(
                "{} is at or below its reorder level ({} <= {})",
                item.sku,
                item.quantity,
                item.reorder_level
            );
        }
        Ok(item)
    }

    /// Items at or below their reorder level, scarcest first.
    pub fn low_stock(&self, scope: &TenantScope) -> ClinicResult<Vec<InventoryItem>> {
        let mut low: Vec<InventoryItem> = scope
            .list(self.stores.inventory.as_ref())?
            .into_iter()
            .filter(InventoryItem::is_low_stock)
            .collect();
        low.sort_by_key(|i| (i.quantity, i.sku.clone()));
        Ok(low)
    }

    /// Items whose expiry date falls within `days` from today. Already expired items are
    /// included so they get pulled from the shelf.
    pub fn expiring_within(&self, scope: &TenantScope, days: i64) -> ClinicResult<Vec<InventoryItem>> {
        if !(0..=MAX_EXPIRY_WINDOW_DAYS).contains(&days) {
            return Err(ClinicError::invalid(
                "days",
                format!("must be between 0 and {MAX_EXPIRY_WINDOW_DAYS}"),
            ));
        }
        let cutoff = Utc::now().date_naive() + Duration::days(days);
        let mut expiring: Vec<InventoryItem> = scope
            .list(self.stores.inventory.as_ref())?
            .into_iter()
            .filter(|i| i.expiry_date.is_some_and(|d| d <= cutoff))
            .collect();
        expiring.sort_by_key(|i| (i.expiry_date, i.sku.clone()));
        Ok(expiring)
    }

    pub fn delete(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<()> {
        let _guard = self.stores.write_guard()?;
        let mut item = self.get(scope, id)?;
        let now = Utc::now();
        item.deleted_at = Some(now);
        item.updated_at = now;
        self.stores.inventory.update(item)?;
        tracing::info!("deleted inventory item {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InventoryCategory;
    use crate::services::test_support::{scope, services};
    use chrono::NaiveDate;

    fn item(sku: &str, name: &str, quantity: u32, expiry_date: Option<NaiveDate>) -> NewInventoryItem {
        NewInventoryItem {
            branch_id: None,
            sku: sku.into(),
            name: name.into(),
            category: InventoryCategory::Medication,
            quantity,
            reorder_level: 5,
            unit_cost_cents: 250,
            expiry_date,
        }
    }

    #[test]
    fn sku_unique_per_branch() {
        let (services, _temp) = services();
        let north = scope().with_branch(RecordId::new());
        let south = scope().with_branch(RecordId::new());

        services.inventory.create(&north, item("amox-500", "Amoxicillin", 10, None)).unwrap();
        assert!(matches!(
            services.inventory.create(&north, item("AMOX-500", "Amoxicillin", 3, None)),
            Err(ClinicError::Conflict(_))
        ));
        services.inventory.create(&south, item("AMOX-500", "Amoxicillin", 3, None)).unwrap();
    }

    #[test]
    fn stock_never_goes_negative() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let created = services.inventory.create(&scope, item("GAUZE", "Gauze", 8, None)).unwrap();

        let after = services
            .inventory
            .adjust_stock(
                &scope,
                &created.id,
                StockAdjustment {
                    delta: -4,
                    reason: "dressing change".into(),
                },
            )
            .unwrap();
        assert_eq!(after.quantity, 4);
        assert_eq!(services.inventory.low_stock(&scope).unwrap().len(), 1);

        let err = services
            .inventory
            .adjust_stock(
                &scope,
                &created.id,
                StockAdjustment {
                    delta: -5,
                    reason: "dressing change".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
        assert_eq!(services.inventory.get(&scope, &created.id).unwrap().quantity, 4);
    }

    #[test]
    fn expiring_includes_expired_and_excludes_deleted() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        let today = Utc::now().date_naive();

        let expired = services
            .inventory
            .create(&scope, item("OLD", "Saline", 20, Some(today - Duration::days(3))))
            .unwrap();
        let soon = services
            .inventory
            .create(&scope, item("SOON", "Lidocaine", 20, Some(today + Duration::days(10))))
            .unwrap();
        services
            .inventory
            .create(&scope, item("LATER", "Iodine", 20, Some(today + Duration::days(90))))
            .unwrap();
        let gone = services
            .inventory
            .create(&scope, item("GONE", "Betadine", 20, Some(today)))
            .unwrap();
        services.inventory.delete(&scope, &gone.id).unwrap();

        let ids: Vec<RecordId> = services
            .inventory
            .expiring_within(&scope, 30)
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![expired.id, soon.id]);

        assert!(services.inventory.expiring_within(&scope, -1).is_err());
        assert!(matches!(
            services.inventory.get(&scope, &gone.id),
            Err(ClinicError::NotFound { .. })
        ));
    }

    #[test]
    fn list_is_sorted_by_name() {
        let (services, _temp) = services();
        let scope = scope().with_branch(RecordId::new());
        for (sku, name) in [("C1", "cotton"), ("A1", "Alcohol swab"), ("B1", "Bandage")] {
            services.inventory.create(&scope, item(sku, name, 10, None)).unwrap();
        }
        let page = services.inventory.list(&scope, &PageRequest::new(1, 2)).unwrap();
        let names: Vec<&str> = page.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Alcohol swab", "Bandage"]);
        assert_eq!(page.total_count, 3);
    }
}
