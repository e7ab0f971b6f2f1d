use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Percentage};
use crate::invoicing::lines::{InvoiceTotals, LineAmounts, LineInput};
use crate::types::{
    CoreStatus, DocumentId, InvoiceId, InvoiceStatus, InvoiceType, PaymentId, ThirdPartyId,
    TransactionId,
};

/// invoice with its owned lines, payments and attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    pub third_party_id: ThirdPartyId,
    pub invoice_number: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub amount_paid: Money,
    pub status: CoreStatus,
    pub payment_terms: Option<String>,
    pub lines: Vec<InvoiceLine>,
    pub payments: Vec<InvoicePayment>,
    pub documents: Vec<AttachedDocument>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub designation: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub tax_rate: Percentage,
    pub discount: Percentage,
    pub line_subtotal: Money,
    pub line_tax: Money,
    pub line_total: Money,
}

impl InvoiceLine {
    pub fn from_input(input: &LineInput, amounts: LineAmounts) -> Self {
        Self {
            designation: input.designation.trim().to_string(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            tax_rate: input.tax_rate.unwrap_or(Percentage::ZERO),
            discount: input.discount.unwrap_or(Percentage::ZERO),
            line_subtotal: amounts.line_subtotal,
            line_tax: amounts.line_tax,
            line_total: amounts.line_total,
        }
    }
}

/// immutable record of money received or paid against an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePayment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub transaction_id: Option<TransactionId>,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub payment_method: Option<String>,
    pub idempotency_key: Option<String>,
}

/// metadata of a file stored elsewhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedDocument {
    pub id: DocumentId,
    pub invoice_id: InvoiceId,
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
}

impl Invoice {
    pub fn remaining(&self) -> Money {
        self.total_amount - self.amount_paid
    }

    pub fn apply_totals(&mut self, totals: InvoiceTotals) {
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
    }

    /// overdue once the grace period after the due date has fully elapsed
    /// and something is still owed
    pub fn is_overdue(&self, as_of: NaiveDate, grace_days: u32) -> bool {
        if !self.status.can_be_overdue() || !self.remaining().is_positive() {
            return false;
        }
        // a grace period running past the calendar never ends
        match self.due_date.checked_add_days(Days::new(u64::from(grace_days))) {
            Some(deadline) => deadline < as_of,
            None => false,
        }
    }

    /// whole days past the due date, zero when not overdue
    pub fn days_overdue(&self, as_of: NaiveDate, grace_days: u32) -> i64 {
        if !self.is_overdue(as_of, grace_days) {
            return 0;
        }
        (as_of - self.due_date).num_days()
    }

    pub fn display_status(&self, as_of: NaiveDate, grace_days: u32) -> InvoiceStatus {
        InvoiceStatus::derive(self.status, self.is_overdue(as_of, grace_days))
    }

    /// status implied by the amount paid so far
    pub fn status_after_payment(&self) -> CoreStatus {
        if self.amount_paid.is_zero() {
            self.status
        } else if self.amount_paid < self.total_amount {
            CoreStatus::PartiellementPaye
        } else {
            CoreStatus::Paye
        }
    }

    pub fn view(&self, as_of: NaiveDate, grace_days: u32) -> InvoiceView {
        let is_overdue = self.is_overdue(as_of, grace_days);
        InvoiceView {
            display_status: InvoiceStatus::derive(self.status, is_overdue),
            is_overdue,
            remaining: self.remaining(),
            invoice: self.clone(),
        }
    }
}

/// invoice as read at a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub display_status: InvoiceStatus,
    pub is_overdue: bool,
    pub remaining: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(status: CoreStatus, total: i64, paid: i64) -> Invoice {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Invoice {
            id: Uuid::new_v4(),
            invoice_type: InvoiceType::Client,
            third_party_id: Uuid::new_v4(),
            invoice_number: Some("FAC-2024-0001".to_string()),
            issue_date: date(2024, 1, 1),
            due_date: date(2024, 1, 31),
            subtotal: Money::from_major(total),
            tax_amount: Money::ZERO,
            total_amount: Money::from_major(total),
            amount_paid: Money::from_major(paid),
            status,
            payment_terms: None,
            lines: Vec::new(),
            payments: Vec::new(),
            documents: Vec::new(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_overdue_is_an_overlay() {
        let inv = invoice(CoreStatus::PartiellementPaye, 1000, 600);

        assert!(!inv.is_overdue(date(2024, 1, 31), 0));
        assert!(inv.is_overdue(date(2024, 2, 1), 0));
        assert_eq!(inv.display_status(date(2024, 2, 1), 0), InvoiceStatus::EnRetard);
        assert_eq!(inv.status, CoreStatus::PartiellementPaye);
        assert_eq!(inv.days_overdue(date(2024, 2, 10), 0), 10);
    }

    #[test]
    fn test_grace_days_delay_overdue() {
        let inv = invoice(CoreStatus::Envoye, 100, 0);
        assert!(!inv.is_overdue(date(2024, 2, 5), 5));
        assert!(inv.is_overdue(date(2024, 2, 6), 5));
        assert_eq!(inv.days_overdue(date(2024, 2, 6), 5), 6);
    }

    #[test]
    fn test_draft_paid_and_cancelled_never_overdue() {
        let late = date(2025, 1, 1);
        for status in [CoreStatus::Brouillon, CoreStatus::Paye, CoreStatus::Annule] {
            assert!(!invoice(status, 100, 0).is_overdue(late, 0));
        }
    }

    #[test]
    fn test_huge_grace_period_never_elapses() {
        let inv = invoice(CoreStatus::Envoye, 100, 0);
        assert!(!inv.is_overdue(NaiveDate::MAX, u32::MAX));
        assert_eq!(inv.days_overdue(NaiveDate::MAX, u32::MAX), 0);
    }

    #[test]
    fn test_nothing_owed_is_never_overdue() {
        let late = date(2025, 1, 1);
        assert!(!invoice(CoreStatus::Envoye, 0, 0).is_overdue(late, 0));
        assert_eq!(invoice(CoreStatus::Envoye, 0, 0).display_status(late, 0), InvoiceStatus::Envoye);
    }

    #[test]
    fn test_status_after_payment() {
        assert_eq!(invoice(CoreStatus::Envoye, 1000, 0).status_after_payment(), CoreStatus::Envoye);
        assert_eq!(
            invoice(CoreStatus::Envoye, 1000, 600).status_after_payment(),
            CoreStatus::PartiellementPaye
        );
        assert_eq!(invoice(CoreStatus::PartiellementPaye, 1000, 1000).status_after_payment(), CoreStatus::Paye);
    }

    #[test]
    fn test_view_flattens_invoice() {
        let inv = invoice(CoreStatus::Envoye, 1000, 250);
        let json = serde_json::to_value(inv.view(date(2024, 3, 1), 0)).unwrap();

        assert_eq!(json["status"], "envoye");
        assert_eq!(json["display_status"], "en_retard");
        assert_eq!(json["remaining"], "750.00");
        assert_eq!(json["type"], "client");
    }
}
