pub mod reconciliation;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{Result, SuiteError};
use crate::invoicing::InvoicePayment;
use crate::ledger::Transaction;
use crate::types::{AccountId, CategoryId, CoreStatus};

pub use reconciliation::apply_payment;

/// payment request against an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// account credited (client invoice) or debited (depense invoice)
    pub account_id: AccountId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub transaction_category_id: Option<CategoryId>,
    #[serde(default)]
    pub description: Option<String>,
    /// same key on the same invoice replays the first application
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// what the invoice can still absorb
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentContext {
    pub status: CoreStatus,
    pub total_amount: Money,
    pub amount_paid: Money,
}

impl PaymentContext {
    pub fn remaining(&self) -> Money {
        self.total_amount - self.amount_paid
    }

    pub fn validate_payment(&self, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(SuiteError::NonPositivePayment { amount });
        }
        if self.status == CoreStatus::Annule {
            return Err(SuiteError::IllegalTransition {
                action: "pay",
                status: self.status,
            });
        }
        if amount > self.remaining() {
            return Err(SuiteError::Overpayment {
                remaining: self.remaining(),
                requested: amount,
            });
        }
        Ok(())
    }
}

/// outcome of a payment application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: InvoicePayment,
    pub transaction: Transaction,
    pub invoice_status: CoreStatus,
    pub amount_paid: Money,
    pub remaining: Money,
    /// true when an earlier application was returned for a repeated key
    pub replayed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn context(status: CoreStatus, total: i64, paid: i64) -> PaymentContext {
        PaymentContext {
            status,
            total_amount: Money::from_major(total),
            amount_paid: Money::from_major(paid),
        }
    }

    #[test]
    fn test_validate_payment() {
        let ctx = context(CoreStatus::Envoye, 1000, 0);
        assert!(ctx.validate_payment(Money::from_major(1000)).is_ok());

        let err = ctx.validate_payment(Money::from_minor(100_001)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = ctx.validate_payment(Money::ZERO).unwrap_err();
        assert!(matches!(err, SuiteError::NonPositivePayment { .. }));
    }

    #[test]
    fn test_paid_invoice_has_nothing_left() {
        let err = context(CoreStatus::Paye, 1000, 1000)
            .validate_payment(Money::CENT)
            .unwrap_err();
        assert!(matches!(err, SuiteError::Overpayment { .. }));
    }

    #[test]
    fn test_cancelled_invoice_refuses_payments() {
        let err = context(CoreStatus::Annule, 1000, 0)
            .validate_payment(Money::from_major(10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
