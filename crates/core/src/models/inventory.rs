use super::clean;
use crate::constants::{MAX_NAME_LEN, MAX_SHORT_TEXT_LEN};
use crate::sanitizer::{is_valid, InputKind};
use crate::store::Record;
use crate::validation::{Validate, Validator};
use crate::ClinicResult;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::{NonEmptyText, TenantId};
use clinic_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Movements kept on the item; older entries are dropped first.
const MAX_MOVEMENTS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum InventoryCategory {
    Medication,
    Consumable,
    Equipment,
    HearingAid,
    DentalMaterial,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub delta: i64,
    pub reason: String,
    pub quantity_after: u32,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub branch_id: RecordId,
    /// Upper-case code, unique per tenant and branch
    pub sku: String,
    pub name: NonEmptyText,
    pub category: InventoryCategory,
    pub quantity: u32,
    pub reorder_level: u32,
    pub unit_cost_cents: i64,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub movements: Vec<StockMovement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Applies `delta`, returning `None` if stock would go negative or overflow.
    pub(crate) fn apply_adjustment(
        &mut self,
        delta: i64,
        reason: String,
        now: DateTime<Utc>,
    ) -> Option<u32> {
        let next = i64::from(self.quantity).checked_add(delta)?;
        let next = u32::try_from(next).ok()?;
        self.quantity = next;
        self.movements.push(StockMovement {
            delta,
            reason,
            quantity_after: next,
            at: now,
        });
        if self.movements.len() > MAX_MOVEMENTS {
            let excess = self.movements.len() - MAX_MOVEMENTS;
            self.movements.drain(..excess);
        }
        self.updated_at = now;
        Some(next)
    }
}

impl Record for InventoryItem {
    const KIND: &'static str = "inventory_item";

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    fn branch_id(&self) -> Option<RecordId> {
        Some(self.branch_id)
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    pub branch_id: Option<RecordId>,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub category: InventoryCategory,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub reorder_level: u32,
    #[serde(default)]
    pub unit_cost_cents: i64,
    pub expiry_date: Option<NaiveDate>,
}

impl NewInventoryItem {
    fn check(&self, v: &mut Validator) -> Option<(String, NonEmptyText)> {
        let sku = self.sku.trim().to_ascii_uppercase();
        let sku_ok = is_valid(&sku, InputKind::Code);
        v.check(sku_ok, "sku", "must be 1-20 characters of A-Z, 0-9, '.' or '-'");
        let name = v.text("name", &self.name, MAX_NAME_LEN);
        v.check(self.unit_cost_cents >= 0, "unitCostCents", "must not be negative");
        Some((sku_ok.then_some(sku)?, name?))
    }

    pub(crate) fn into_item(
        self,
        tenant_id: TenantId,
        branch_id: RecordId,
        now: DateTime<Utc>,
    ) -> ClinicResult<InventoryItem> {
        let mut v = Validator::new();
        let parts = self.check(&mut v);
        v.finish_with(|| {
            let (sku, name) = parts?;
            Some(InventoryItem {
                id: RecordId::new(),
                tenant_id,
                branch_id,
                sku,
                name,
                category: self.category,
                quantity: self.quantity,
                reorder_level: self.reorder_level,
                unit_cost_cents: self.unit_cost_cents,
                expiry_date: self.expiry_date,
                movements: Vec::new(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
        })
    }
}

impl Validate for NewInventoryItem {
    fn collect_errors(&self, v: &mut Validator) {
        let _ = self.check(v);
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    /// Positive to receive stock, negative to dispense
    pub delta: i64,
    pub reason: String,
}

impl StockAdjustment {
    pub(crate) fn checked_reason(&self) -> ClinicResult<String> {
        let mut v = Validator::new();
        v.check(self.delta != 0, "delta", "must not be zero");
        let reason = v.text("reason", &self.reason, MAX_SHORT_TEXT_LEN);
        v.finish_with(|| reason.map(|r| clean(r.as_str(), MAX_SHORT_TEXT_LEN)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, reorder_level: u32) -> InventoryItem {
        NewInventoryItem {
            branch_id: None,
            sku: " gauze-10 ".into(),
            name: "Gauze".into(),
            category: InventoryCategory::Consumable,
            quantity,
            reorder_level,
            unit_cost_cents: 120,
            expiry_date: None,
        }
        .into_item(TenantId::new("acme").unwrap(), RecordId::new(), Utc::now())
        .unwrap()
    }

    #[test]
    fn sku_is_normalized() {
        assert_eq!(item(1, 0).sku, "GAUZE-10");
    }

    #[test]
    fn rejects_bad_sku() {
        let input = NewInventoryItem {
            branch_id: None,
            sku: "../etc".into(),
            name: "x".into(),
            category: InventoryCategory::Other,
            quantity: 0,
            reorder_level: 0,
            unit_cost_cents: -1,
            expiry_date: None,
        };
        let err = input.validate().unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.get("sku").is_some());
        assert!(fields.get("unitCostCents").is_some());
    }

    #[test]
    fn adjustments_never_go_negative() {
        let mut gauze = item(5, 2);
        assert_eq!(gauze.apply_adjustment(-3, "dispensed".into(), Utc::now()), Some(2));
        assert!(gauze.is_low_stock());
        assert_eq!(gauze.apply_adjustment(-3, "dispensed".into(), Utc::now()), None);
        assert_eq!(gauze.quantity, 2);
        assert_eq!(gauze.movements.len(), 1);
    }

    #[test]
    fn movement_history_is_bounded() {
        let mut gauze = item(0, 0);
        for _ in 0..(MAX_MOVEMENTS + 5) {
            gauze.apply_adjustment(1, "received".into(), Utc::now());
        }
        assert_eq!(gauze.movements.len(), MAX_MOVEMENTS);
        assert_eq!(gauze.movements.last().unwrap().quantity_after, gauze.quantity);
    }
}
