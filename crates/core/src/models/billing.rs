//! Invoices, line items and payments.
//!
//! Money is always integer cents. Percentages are applied in basis points and rounded half
//! up to the cent, discount first and tax on the discounted amount.

use super::{clean, notes_field};
use crate::constants::{MAX_NAME_LEN, MAX_SHORT_TEXT_LEN};
use crate::store::Record;
use crate::validation::{Validate, Validator};
use crate::ClinicResult;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::{NonEmptyText, TenantId};
use clinic_uuid::RecordId;
use serde::{Deserialize, Serialize};

const MAX_LINE_ITEMS: usize = 200;
const MAX_QUANTITY: u32 = 10_000;
const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;

/// `amount * percent / 100`, rounded half up to the cent.
fn percent_of(amount_cents: i64, percent: f64) -> i64 {
    let basis_points = (percent * 100.0).round() as i64;
    (amount_cents * basis_points + 5_000).div_euclid(10_000)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum InvoiceStatus {
    Draft,
    Issued,
    PartiallyPaid,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum PaymentMethod {
    Cash,
    Card,
    Insurance,
    BankTransfer,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: NonEmptyText,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl LineItem {
    pub fn amount_cents(&self) -> i64 {
        i64::from(self.quantity) * self.unit_price_cents
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub balance_cents: i64,
}

impl InvoiceTotals {
    pub fn compute(
        line_items: &[LineItem],
        discount_percent: f64,
        tax_percent: f64,
        payments: &[Payment],
    ) -> Self {
        let subtotal_cents: i64 = line_items.iter().map(LineItem::amount_cents).sum();
        let discount_cents = percent_of(subtotal_cents, discount_percent);
        let discounted = subtotal_cents - discount_cents;
        let tax_cents = percent_of(discounted, tax_percent);
        let total_cents = discounted + tax_cents;
        let paid_cents: i64 = payments.iter().map(|p| p.amount_cents).sum();
        Self {
            subtotal_cents,
            discount_cents,
            tax_cents,
            total_cents,
            paid_cents,
            balance_cents: total_cents - paid_cents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub patient_id: RecordId,
    /// `INV-000001`, sequential per tenant
    pub number: String,
    pub line_items: Vec<LineItem>,
    pub discount_percent: f64,
    pub tax_percent: f64,
    #[serde(default)]
    pub payments: Vec<Payment>,
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Recomputed on every write
    pub totals: InvoiceTotals,
    pub issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn format_number(sequence: u32) -> String {
        format!("INV-{sequence:06}")
    }

    /// Sequence part of `number`, if it is well formed.
    pub fn sequence(&self) -> Option<u32> {
        self.number.strip_prefix("INV-")?.parse().ok()
    }

    pub(crate) fn recompute_totals(&mut self) {
        self.totals = InvoiceTotals::compute(
            &self.line_items,
            self.discount_percent,
            self.tax_percent,
            &self.payments,
        );
    }
}

impl Record for Invoice {
    const KIND: &'static str = "invoice";

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub patient_id: RecordId,
    #[serde(default)]
    pub line_items: Vec<NewLineItem>,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub tax_percent: f64,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewInvoice {
    fn check(&self, v: &mut Validator) -> Option<(Vec<LineItem>, Option<String>)> {
        v.check(
            self.line_items.len() <= MAX_LINE_ITEMS,
            "lineItems",
            format!("at most {MAX_LINE_ITEMS} line items"),
        );
        let mut items = Vec::with_capacity(self.line_items.len());
        let mut items_ok = true;
        for (i, item) in self.line_items.iter().enumerate() {
            let description = v.text(
                &format!("lineItems[{i}].description"),
                &item.description,
                MAX_SHORT_TEXT_LEN,
            );
            v.range(
                &format!("lineItems[{i}].quantity"),
                item.quantity,
                1,
                MAX_QUANTITY,
            );
            v.range(
                &format!("lineItems[{i}].unitPriceCents"),
                item.unit_price_cents,
                0,
                MAX_UNIT_PRICE_CENTS,
            );
            match description {
                Some(description) => items.push(LineItem {
                    description,
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price_cents,
                }),
                None => items_ok = false,
            }
        }
        v.range("discountPercent", self.discount_percent, 0.0, 100.0);
        v.range("taxPercent", self.tax_percent, 0.0, 100.0);
        v.check(
            self.discount_percent.is_finite() && self.tax_percent.is_finite(),
            "discountPercent",
            "must be a number",
        );
        let notes = notes_field(v, "notes", self.notes.as_deref());
        Some((items_ok.then_some(items)?, notes?))
    }

    pub(crate) fn into_invoice(
        self,
        tenant_id: TenantId,
        number: String,
        now: DateTime<Utc>,
    ) -> ClinicResult<Invoice> {
        let mut v = Validator::new();
        let parts = self.check(&mut v);
        v.finish_with(|| {
            let (line_items, notes) = parts?;
            let mut invoice = Invoice {
                id: RecordId::new(),
                tenant_id,
                patient_id: self.patient_id,
                number,
                line_items,
                discount_percent: self.discount_percent,
                tax_percent: self.tax_percent,
                payments: Vec::new(),
                status: InvoiceStatus::Draft,
                due_date: self.due_date,
                notes,
                totals: InvoiceTotals::default(),
                issued_at: None,
                created_at: now,
                updated_at: now,
            };
            invoice.recompute_totals();
            Some(invoice)
        })
    }
}

impl Validate for NewInvoice {
    fn collect_errors(&self, v: &mut Validator) {
        let _ = self.check(v);
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

impl NewPayment {
    pub(crate) fn into_payment(self, now: DateTime<Utc>) -> ClinicResult<Payment> {
        let mut v = Validator::new();
        v.check(self.amount_cents > 0, "amountCents", "must be positive");
        let reference = v.optional_text("reference", self.reference.as_deref(), MAX_NAME_LEN);
        v.finish_with(|| {
            Some(Payment {
                amount_cents: self.amount_cents,
                method: self.method,
                paid_at: now,
                reference: reference?.map(|r| clean(r.as_str(), MAX_NAME_LEN)),
            })
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InvoiceFilter {
    #[param(value_type = Option<String>)]
    pub status: Option<InvoiceStatus>,
    #[param(value_type = Option<String>)]
    pub patient_id: Option<RecordId>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.status.map_or(true, |s| invoice.status == s)
            && self.patient_id.map_or(true, |p| invoice.patient_id == p)
    }
}
