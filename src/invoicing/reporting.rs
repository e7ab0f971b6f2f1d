use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::books::Books;
use crate::decimal::Money;
use crate::errors::{Result, SuiteError};
use crate::invoicing::invoice::InvoiceView;
use crate::types::{InvoiceId, InvoiceStatus, InvoiceType, ThirdPartyId};

/// criteria for listing invoices, all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceFilter {
    #[serde(rename = "type")]
    pub invoice_type: Option<InvoiceType>,
    pub third_party_id: Option<ThirdPartyId>,
    /// matched against the displayed status, so `en_retard` works
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueInvoice {
    pub invoice_id: InvoiceId,
    pub invoice_number: Option<String>,
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    pub third_party_id: ThirdPartyId,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub remaining: Money,
}

/// open amounts for one direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub open_invoices: usize,
    pub outstanding: Money,
    pub overdue_invoices: usize,
    pub overdue_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivablesSummary {
    pub as_of: NaiveDate,
    /// client invoices still to be collected
    pub receivables: Exposure,
    /// depense invoices still to be paid
    pub payables: Exposure,
}

pub fn list_invoices(
    books: &Books,
    filter: &InvoiceFilter,
    as_of: NaiveDate,
    grace_days: u32,
) -> Vec<InvoiceView> {
    let mut views: Vec<InvoiceView> = books
        .invoices
        .values()
        .filter(|inv| filter.invoice_type.map_or(true, |t| inv.invoice_type == t))
        .filter(|inv| filter.third_party_id.map_or(true, |p| inv.third_party_id == p))
        .map(|inv| inv.view(as_of, grace_days))
        .filter(|view| filter.status.map_or(true, |s| view.display_status == s))
        .collect();
    views.sort_by(|a, b| {
        (a.invoice.issue_date, &a.invoice.invoice_number)
            .cmp(&(b.invoice.issue_date, &b.invoice.invoice_number))
    });
    views
}

/// overdue pass, most late first
pub fn sweep_overdue(books: &Books, as_of: NaiveDate, grace_days: u32) -> Vec<OverdueInvoice> {
    let mut overdue: Vec<OverdueInvoice> = books
        .invoices
        .values()
        .filter(|inv| inv.is_overdue(as_of, grace_days))
        .map(|inv| OverdueInvoice {
            invoice_id: inv.id,
            invoice_number: inv.invoice_number.clone(),
            invoice_type: inv.invoice_type,
            third_party_id: inv.third_party_id,
            due_date: inv.due_date,
            days_overdue: inv.days_overdue(as_of, grace_days),
            remaining: inv.remaining(),
        })
        .collect();
    overdue.sort_by(|a, b| {
        b.days_overdue
            .cmp(&a.days_overdue)
            .then_with(|| a.invoice_number.cmp(&b.invoice_number))
    });
    overdue
}

pub fn receivables_summary(books: &Books, as_of: NaiveDate, grace_days: u32) -> Result<ReceivablesSummary> {
    let mut summary = ReceivablesSummary {
        as_of,
        receivables: Exposure::default(),
        payables: Exposure::default(),
    };
    for inv in books.invoices.values().filter(|inv| inv.status.can_be_overdue()) {
        let exposure = match inv.invoice_type {
            InvoiceType::Client => &mut summary.receivables,
            InvoiceType::Depense => &mut summary.payables,
        };
        let remaining = inv.remaining();
        exposure.open_invoices += 1;
        exposure.outstanding = total(exposure.outstanding, remaining)?;
        if inv.is_overdue(as_of, grace_days) {
            exposure.overdue_invoices += 1;
            exposure.overdue_amount = total(exposure.overdue_amount, remaining)?;
        }
    }
    Ok(summary)
}

fn total(sum: Money, amount: Money) -> Result<Money> {
    sum.checked_add(amount).ok_or(SuiteError::AmountOverflow {
        context: "receivables total",
    })
}
