//! Links a payment to its invoice and to the ledger.
//!
//! Must run inside [`crate::books::SharedBooks::atomically`]: any failure
//! after the transaction is posted leaves nothing behind once the unit is
//! discarded.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::books::Books;
use crate::errors::{Result, SuiteError};
use crate::events::Event;
use crate::invoicing::lifecycle::change_status;
use crate::invoicing::InvoicePayment;
use crate::ledger::{self, NewTransaction, TransactionOrigin};
use crate::payments::{PaymentContext, PaymentReceipt, PaymentRequest};
use crate::types::InvoiceId;

fn key_for(invoice_id: InvoiceId, key: &str) -> String {
    format!("{}:{}", invoice_id, key)
}

/// return the earlier application of `key`, or fail when the request differs
fn replay(
    books: &Books,
    invoice_id: InvoiceId,
    key: &str,
    request: &PaymentRequest,
) -> Result<Option<PaymentReceipt>> {
    let Some(payment_id) = books.payment_keys.get(&key_for(invoice_id, key)).copied() else {
        return Ok(None);
    };
    let invoice = books.invoice(invoice_id)?;
    let payment = invoice
        .payments
        .iter()
        .find(|p| p.id == payment_id)
        .ok_or(SuiteError::not_found("invoice payment", payment_id))?;
    let transaction_id = payment
        .transaction_id
        .ok_or(SuiteError::not_found("transaction", payment_id))?;
    let transaction = books.transaction(transaction_id)?;

    if payment.amount != request.amount
        || payment.payment_date != request.payment_date
        || transaction.account_id != request.account_id
    {
        return Err(SuiteError::IdempotencyKeyReused {
            key: key.to_string(),
        });
    }

    Ok(Some(PaymentReceipt {
        payment: payment.clone(),
        transaction: transaction.clone(),
        invoice_status: invoice.status,
        amount_paid: invoice.amount_paid,
        remaining: invoice.remaining(),
        replayed: true,
    }))
}

/// record the payment, post its transaction, move the account balance and
/// advance the invoice status
pub fn apply_payment(
    books: &mut Books,
    invoice_id: InvoiceId,
    request: PaymentRequest,
    now: DateTime<Utc>,
) -> Result<PaymentReceipt> {
    let key = request
        .idempotency_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);
    if let Some(key) = &key {
        if let Some(receipt) = replay(books, invoice_id, key, &request)? {
            debug!(%invoice_id, key = %key, "payment replayed");
            return Ok(receipt);
        }
    }

    let invoice = books.invoice(invoice_id)?;
    PaymentContext {
        status: invoice.status,
        total_amount: invoice.total_amount,
        amount_paid: invoice.amount_paid,
    }
    .validate_payment(request.amount)?;

    let flow = invoice.invoice_type.flow();
    let description = request
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Paiement facture {}",
                invoice.invoice_number.as_deref().unwrap_or_default()
            )
        });

    let payment_id = Uuid::new_v4();
    let transaction = ledger::post(
        books,
        NewTransaction {
            account_id: request.account_id,
            transaction_category_id: request.transaction_category_id,
            flow,
            amount: request.amount,
            description: Some(description),
            transaction_date: request.payment_date,
        },
        TransactionOrigin::InvoicePayment {
            invoice_id,
            payment_id,
        },
    )?;

    let payment = InvoicePayment {
        id: payment_id,
        invoice_id,
        transaction_id: Some(transaction.id),
        amount: request.amount,
        payment_date: request.payment_date,
        payment_method: request
            .payment_method
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
        idempotency_key: key.clone(),
    };

    let invoice = books.invoice_mut(invoice_id)?;
    invoice.amount_paid += payment.amount;
    invoice.payments.push(payment.clone());
    invoice.updated_at = now;
    let next_status = invoice.status_after_payment();
    let changed = change_status(invoice, next_status, "payment", now);
    let (invoice_status, amount_paid, remaining) =
        (invoice.status, invoice.amount_paid, invoice.remaining());

    if let Some(event) = changed {
        books.emit(event);
    }
    if let Some(key) = key {
        books.payment_keys.insert(key_for(invoice_id, &key), payment_id);
    }
    books.emit(Event::PaymentApplied {
        invoice_id,
        payment_id,
        transaction_id: transaction.id,
        amount: payment.amount,
        amount_paid,
        remaining,
        payment_date: payment.payment_date,
    });

    Ok(PaymentReceipt {
        payment,
        transaction,
        invoice_status,
        amount_paid,
        remaining,
        replayed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::SharedBooks;
    use crate::config::NumberingConfig;
    use crate::decimal::{Money, Percentage};
    use crate::errors::ErrorKind;
    use crate::invoicing::lifecycle::{create_invoice, mark_sent, InvoiceDraft};
    use crate::invoicing::LineInput;
    use crate::ledger::{open_account, NewAccount};
    use crate::parties::{register_third_party, NewThirdParty};
    use crate::types::{AccountId, AccountType, CoreStatus, FlowType, InvoiceType, ThirdPartyType};
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    /// account at 1000, one sent invoice of 1000
    fn setup(invoice_type: InvoiceType) -> (Books, AccountId, InvoiceId) {
        let mut books = Books::new();
        let account = open_account(
            &mut books,
            NewAccount {
                name: "Mvola".to_string(),
                account_type: AccountType::MobileMoney,
                currency: None,
                opening_balance: Money::from_major(1000),
            },
            "MGA",
        )
        .unwrap();
        let party = register_third_party(
            &mut books,
            NewThirdParty {
                name: "Rova".to_string(),
                party_type: invoice_type.counterparty(),
                details: None,
                email: None,
            },
        )
        .unwrap();
        let invoice = create_invoice(
            &mut books,
            &NumberingConfig::default(),
            InvoiceDraft {
                invoice_type,
                third_party_id: party.id,
                invoice_number: None,
                issue_date: date(2024, 3, 1),
                due_date: date(2024, 3, 31),
                payment_terms: None,
                lines: vec![LineInput {
                    designation: "Audit".to_string(),
                    quantity: dec!(1),
                    unit_price: Money::from_major(1000),
                    tax_rate: None,
                    discount: Some(Percentage::ZERO),
                }],
            },
            now(),
        )
        .unwrap();
        mark_sent(&mut books, invoice.id, false, now()).unwrap();
        (books, account.id, invoice.id)
    }

    fn request(account_id: AccountId, amount: Money) -> PaymentRequest {
        PaymentRequest {
            account_id,
            amount,
            payment_date: date(2024, 3, 10),
            payment_method: Some("virement".to_string()),
            transaction_category_id: None,
            description: None,
            idempotency_key: None,
        }
    }

    #[test]
    fn test_partial_then_full_payment() {
        let (mut books, account, invoice) = setup(InvoiceType::Client);

        let err = apply_payment(&mut books, invoice, request(account, Money::from_minor(100_001)), now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let first = apply_payment(&mut books, invoice, request(account, Money::from_major(600)), now()).unwrap();
        assert_eq!(first.invoice_status, CoreStatus::PartiellementPaye);
        assert_eq!(first.amount_paid, Money::from_major(600));
        assert_eq!(first.transaction.flow, FlowType::Revenu);
        assert_eq!(first.payment.transaction_id, Some(first.transaction.id));
        assert_eq!(first.transaction.description.as_deref(), Some("Paiement facture FAC-2024-0001"));

        let second = apply_payment(&mut books, invoice, request(account, Money::from_major(400)), now()).unwrap();
        assert_eq!(second.invoice_status, CoreStatus::Paye);
        assert_eq!(second.remaining, Money::ZERO);

        assert_eq!(books.account(account).unwrap().balance, Money::from_major(2000));
        assert_eq!(books.invoice(invoice).unwrap().payments.len(), 2);
    }

    #[test]
    fn test_depense_invoice_debits_account() {
        let (mut books, account, invoice) = setup(InvoiceType::Depense);
        let receipt = apply_payment(&mut books, invoice, request(account, Money::from_major(250)), now()).unwrap();

        assert_eq!(receipt.transaction.flow, FlowType::Depense);
        assert_eq!(books.account(account).unwrap().balance, Money::from_major(750));
    }

    #[test]
    fn test_idempotency_key_replays() {
        let (mut books, account, invoice) = setup(InvoiceType::Client);
        let mut req = request(account, Money::from_major(600));
        req.idempotency_key = Some("pay-001".to_string());

        let first = apply_payment(&mut books, invoice, req.clone(), now()).unwrap();
        let again = apply_payment(&mut books, invoice, req.clone(), now()).unwrap();

        assert!(again.replayed);
        assert_eq!(again.payment.id, first.payment.id);
        assert_eq!(books.account(account).unwrap().balance, Money::from_major(1600));
        assert_eq!(books.transactions.len(), 1);

        req.amount = Money::from_major(100);
        let err = apply_payment(&mut books, invoice, req, now()).unwrap_err();
        assert!(matches!(err, SuiteError::IdempotencyKeyReused { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_missing_account_rolls_back_everything() {
        let (books, _, invoice) = setup(InvoiceType::Client);
        let shared = SharedBooks::new(books);

        let err = shared
            .atomically(|books| {
                apply_payment(books, invoice, request(Uuid::new_v4(), Money::from_major(100)), now())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let (paid, payments) = shared
            .read(|books| {
                let inv = books.invoice(invoice).unwrap();
                (inv.amount_paid, inv.payments.len())
            })
            .unwrap();
        assert_eq!(paid, Money::ZERO);
        assert_eq!(payments, 0);
    }

    #[test]
    fn test_random_splits_never_overpay() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use rust_decimal::prelude::ToPrimitive;

        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (mut books, account, invoice) = setup(InvoiceType::Client);
            let total = books.invoice(invoice).unwrap().total_amount;

            loop {
                let remaining = books.invoice(invoice).unwrap().remaining();
                if remaining.is_zero() {
                    break;
                }
                let cents = (remaining.as_decimal() * dec!(100)).to_i64().unwrap();
                if rng.gen_bool(0.2) {
                    let over = Money::from_minor(cents + rng.gen_range(1..=500));
                    let err = apply_payment(&mut books, invoice, request(account, over), now()).unwrap_err();
                    assert_eq!(err.kind(), ErrorKind::Validation);
                }
                let amount = Money::from_minor(rng.gen_range(1..=cents));
                let receipt = apply_payment(&mut books, invoice, request(account, amount), now()).unwrap();

                assert!(receipt.amount_paid.is_positive());
                assert!(receipt.amount_paid <= total);
                assert_eq!(receipt.amount_paid + receipt.remaining, total);
                let expected = if receipt.remaining.is_zero() {
                    CoreStatus::Paye
                } else {
                    CoreStatus::PartiellementPaye
                };
                assert_eq!(receipt.invoice_status, expected);
            }

            let paid = books.invoice(invoice).unwrap();
            assert_eq!(paid.status, CoreStatus::Paye);
            let sum: Money = paid.payments.iter().map(|p| p.amount).sum();
            assert_eq!(sum, total);
            assert_eq!(books.account(account).unwrap().balance, Money::from_major(1000) + total);
        }
    }

    #[test]
    fn test_cancelled_invoice_cannot_be_paid() {
        let (mut books, account, invoice) = setup(InvoiceType::Client);
        crate::invoicing::lifecycle::cancel_invoice(&mut books, invoice, None, now()).unwrap();

        let err = apply_payment(&mut books, invoice, request(account, Money::from_major(10)), now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_payment_linked_transaction_cannot_be_deleted() {
        let (mut books, account, invoice) = setup(InvoiceType::Client);
        let receipt = apply_payment(&mut books, invoice, request(account, Money::from_major(100)), now()).unwrap();

        let err = ledger::delete_transaction(&mut books, receipt.transaction.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
