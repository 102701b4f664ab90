//! Invoicing and payments. All amounts are integer cents.

use super::require_patient;
use crate::models::{Invoice, InvoiceFilter, InvoiceStatus, NewInvoice, NewPayment};
use crate::pagination::{Page, PageRequest};
use crate::store::{Stores, WriteGuard};
use crate::{ClinicError, ClinicResult, TenantScope};
use chrono::Utc;
use clinic_uuid::RecordId;
use serde::Serialize;

/// Unpaid balance across Issued and PartiallyPaid invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingBalance {
    pub invoice_count: usize,
    pub total_cents: i64,
}

#[derive(Clone)]
pub struct BillingService {
    stores: Stores,
}

impl BillingService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Creates a Draft invoice with the tenant's next invoice number.
    pub fn create(&self, scope: &TenantScope, input: NewInvoice) -> ClinicResult<Invoice> {
        require_patient(&self.stores, scope, &input.patient_id)?;
        let guard = self.stores.write_guard()?;
        let number = Invoice::format_number(self.next_sequence(&guard, scope)?);
        let invoice = input.into_invoice(scope.tenant_id().clone(), number, Utc::now())?;
        self.stores.invoices.insert(invoice.clone())?;
        tracing::info!(
            "created invoice {} for patient {} ({} cents)",
            invoice.number,
            invoice.patient_id,
            invoice.totals.total_cents
        );
        Ok(invoice)
    }

    /// One past the highest sequence issued so far in the tenant. Numbers are never reused.
    fn next_sequence(&self, _guard: &WriteGuard<'_>, scope: &TenantScope) -> ClinicResult<u32> {
        let highest = self
            .stores
            .invoices
            .list()?
            .iter()
            .filter(|i| i.tenant_id == *scope.tenant_id())
            .filter_map(Invoice::sequence)
            .max()
            .unwrap_or(0);
        highest
            .checked_add(1)
            .ok_or_else(|| ClinicError::Storage("invoice numbers exhausted".into()))
    }

    pub fn get(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<Invoice> {
        scope.fetch(self.stores.invoices.as_ref(), id)
    }

    /// Invoices matching `filter`, newest number first.
    pub fn list(
        &self,
        scope: &TenantScope,
        filter: &InvoiceFilter,
        page: &PageRequest,
    ) -> ClinicResult<Page<Invoice>> {
        let mut found: Vec<Invoice> = scope
            .list(self.stores.invoices.as_ref())?
            .into_iter()
            .filter(|i| filter.matches(i))
            .collect();
        found.sort_by(|a, b| {
            b.sequence()
                .cmp(&a.sequence())
                .then_with(|| b.number.cmp(&a.number))
        });
        Ok(Page::from_vec(found, page))
    }

    /// Draft → Issued. An invoice needs at least one line item to be issued.
    pub fn issue(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<Invoice> {
        let _guard = self.stores.write_guard()?;
        let mut invoice = self.get(scope, id)?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(ClinicError::Conflict(format!(
                "only draft invoices can be issued; {} is {:?}",
                invoice.number, invoice.status
            )));
        }
        if invoice.line_items.is_empty() {
            return Err(ClinicError::invalid(
                "lineItems",
                "an invoice needs at least one line item to be issued",
            ));
        }
        let now = Utc::now();
        invoice.status = InvoiceStatus::Issued;
        invoice.issued_at = Some(now);
        invoice.updated_at = now;
        self.stores.invoices.update(invoice.clone())?;
        tracing::info!("issued invoice {}", invoice.number);
        Ok(invoice)
    }

    /// Records a payment and moves the invoice to PartiallyPaid or Paid.
    ///
    /// # Errors
    ///
    /// `Conflict` for Draft, Cancelled or Paid invoices, and for payments above the balance.
    pub fn record_payment(
        &self,
        scope: &TenantScope,
        id: &RecordId,
        input: NewPayment,
    ) -> ClinicResult<Invoice> {
        let payment = input.into_payment(Utc::now())?;
        let _guard = self.stores.write_guard()?;
        let mut invoice = self.get(scope, id)?;
        if matches!(
            invoice.status,
            InvoiceStatus::Draft | InvoiceStatus::Cancelled | InvoiceStatus::Paid
        ) {
            return Err(ClinicError::Conflict(format!(
                "cannot take payment on a {:?} invoice",
                invoice.status
            )));
        }
        if payment.amount_cents > invoice.totals.balance_cents {
            return Err(ClinicError::Conflict(format!(
                "payment of {} cents exceeds the balance of {} cents",
                payment.amount_cents, invoice.totals.balance_cents
            )));
        }

        invoice.updated_at = payment.paid_at;
        invoice.payments.push(payment);
        invoice.recompute_totals();
        invoice.status = if invoice.totals.balance_cents == 0 {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
        self.stores.invoices.update(invoice.clone())?;
        tracing::info!(
            "invoice {} is {:?} with {} cents outstanding",
            invoice.number,
            invoice.status,
            invoice.totals.balance_cents
        );
        Ok(invoice)
    }

    /// Cancels an invoice that has not received any payment.
    pub fn cancel(&self, scope: &TenantScope, id: &RecordId) -> ClinicResult<Invoice> {
        let _guard = self.stores.write_guard()?;
        let mut invoice = self.get(scope, id)?;
        if !invoice.payments.is_empty() {
            return Err(ClinicError::Conflict(format!(
                "invoice {} has payments and cannot be cancelled",
                invoice.number
            )));
        }
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(ClinicError::Conflict(format!(
                "invoice {} is already cancelled",
                invoice.number
            )));
        }
        invoice.status = InvoiceStatus::Cancelled;
        invoice.updated_at = Utc::now();
        self.stores.invoices.update(invoice.clone())?;
        tracing::info!("cancelled invoice {}", invoice.number);
        Ok(invoice)
    }

    pub fn outstanding_total(&self, scope: &TenantScope) -> ClinicResult<OutstandingBalance> {
        let open: Vec<Invoice> = scope
            .list(self.stores.invoices.as_ref())?
            .into_iter()
            .filter(|i| {
                matches!(
                    i.status,
                    InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid
                )
            })
            .collect();
        Ok(OutstandingBalance {
            invoice_count: open.len(),
            total_cents: open.iter().map(|i| i.totals.balance_cents).sum(),
        })
    }
}
