use std::sync::Arc;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::books::{Books, SharedBooks};
use crate::config::SuiteConfig;
use crate::errors::{Result, SuiteError};
use crate::events::Event;
use crate::invoicing::{
    lifecycle, reporting, AttachedDocument, Invoice, InvoiceDocument, InvoiceDraft, InvoiceFilter,
    InvoiceNotifier, InvoiceUpdate, InvoiceView, LogNotifier, NewDocument, OverdueInvoice,
    ReceivablesSummary,
};
use crate::ledger::{
    self, Account, NewAccount, NewCategory, NewTransaction, Transaction, TransactionCategory,
};
use crate::parties::{self, NewThirdParty, ThirdParty};
use crate::payments::{self, PaymentReceipt, PaymentRequest};
use crate::recurring::{
    self, Execution, ExecutionReport, NewRecurringOperation, RecurringOperation,
};
use crate::types::{
    AccountId, CategoryId, InvoiceId, OperationId, ThirdPartyId, TransactionId,
};

/// result of sending an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub invoice: Invoice,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    Delivered { recipient: Option<String> },
    /// the invoice stays sent, delivery can be retried out of band
    Failed { reason: String },
}

/// entry point of the suite: every use case runs through here
#[derive(Clone)]
pub struct Suite {
    books: SharedBooks,
    config: SuiteConfig,
    notifier: Arc<dyn InvoiceNotifier>,
}

impl Suite {
    /// empty books, invoices delivered to the log
    pub fn new(config: SuiteConfig) -> Self {
        Self::with_books(config, Books::new())
    }

    pub fn with_books(config: SuiteConfig, mut books: Books) -> Self {
        books.set_event_capacity(config.event_capacity);
        Self {
            books: SharedBooks::new(books),
            config,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn InvoiceNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn books(&self) -> &SharedBooks {
        &self.books
    }

    fn grace_days(&self) -> u32 {
        self.config.overdue.grace_days
    }

    // ledger

    pub fn open_account(&self, new: NewAccount) -> Result<Account> {
        let currency = self.config.default_currency.clone();
        let account = self
            .books
            .atomically(|books| ledger::open_account(books, new, &currency))?;
        info!(account_id = %account.id, name = %account.name, balance = %account.balance, "account opened");
        Ok(account)
    }

    pub fn account(&self, id: AccountId) -> Result<Account> {
        self.books.read(|books| books.account(id).cloned())?
    }

    pub fn create_category(&self, new: NewCategory) -> Result<TransactionCategory> {
        self.books.atomically(|books| ledger::create_category(books, new))
    }

    pub fn record_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        let transaction = self
            .books
            .atomically(|books| ledger::record_transaction(books, new))?;
        info!(
            transaction_id = %transaction.id,
            account_id = %transaction.account_id,
            flow = transaction.flow.as_str(),
            amount = %transaction.amount,
            "transaction recorded"
        );
        Ok(transaction)
    }

    pub fn transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.books.read(|books| books.transaction(id).cloned())?
    }

    pub fn delete_transaction(&self, id: TransactionId) -> Result<()> {
        self.books
            .atomically(|books| ledger::delete_transaction(books, id))?;
        info!(transaction_id = %id, "transaction deleted");
        Ok(())
    }

    pub fn delete_account(&self, id: AccountId) -> Result<()> {
        self.books.atomically(|books| ledger::delete_account(books, id))?;
        info!(account_id = %id, "account deleted");
        Ok(())
    }

    pub fn delete_category(&self, id: CategoryId) -> Result<()> {
        self.books
            .atomically(|books| ledger::delete_category(books, id))
    }

    // third parties

    pub fn register_third_party(&self, new: NewThirdParty) -> Result<ThirdParty> {
        let party = self
            .books
            .atomically(|books| parties::register_third_party(books, new))?;
        info!(third_party_id = %party.id, kind = %party.party_type, "third party registered");
        Ok(party)
    }

    pub fn third_party(&self, id: ThirdPartyId) -> Result<ThirdParty> {
        self.books.read(|books| books.third_party(id).cloned())?
    }

    pub fn delete_third_party(&self, id: ThirdPartyId) -> Result<()> {
        self.books
            .atomically(|books| parties::delete_third_party(books, id))
    }

    // invoices

    pub fn create_invoice(&self, draft: InvoiceDraft, time_provider: &SafeTimeProvider) -> Result<Invoice> {
        let now = time_provider.now();
        let numbering = &self.config.numbering;
        let invoice = self
            .books
            .atomically(|books| lifecycle::create_invoice(books, numbering, draft, now))?;
        info!(
            invoice_id = %invoice.id,
            number = invoice.invoice_number.as_deref().unwrap_or("-"),
            total = %invoice.total_amount,
            "invoice created"
        );
        Ok(invoice)
    }

    pub fn update_draft(
        &self,
        id: InvoiceId,
        update: InvoiceUpdate,
        time_provider: &SafeTimeProvider,
    ) -> Result<Invoice> {
        let now = time_provider.now();
        let invoice = self
            .books
            .atomically(|books| lifecycle::update_draft(books, id, update, now))?;
        info!(invoice_id = %id, total = %invoice.total_amount, "draft updated");
        Ok(invoice)
    }

    pub fn invoice(&self, id: InvoiceId) -> Result<Invoice> {
        self.books.read(|books| books.invoice(id).cloned())?
    }

    /// invoice with its status as seen on `as_of`
    pub fn invoice_view(&self, id: InvoiceId, as_of: NaiveDate) -> Result<InvoiceView> {
        let grace = self.grace_days();
        self.books
            .read(|books| books.invoice(id).map(|inv| inv.view(as_of, grace)))?
    }

    pub fn list_invoices(&self, filter: &InvoiceFilter, as_of: NaiveDate) -> Result<Vec<InvoiceView>> {
        let grace = self.grace_days();
        self.books
            .read(|books| reporting::list_invoices(books, filter, as_of, grace))
    }

    /// brouillon -> envoye, then hand the rendered invoice to the notifier
    ///
    /// A delivery failure is logged and recorded as an event; the invoice
    /// remains sent.
    pub fn send_invoice(&self, id: InvoiceId, time_provider: &SafeTimeProvider) -> Result<SendOutcome> {
        let now = time_provider.now();
        let require_email = self.config.notification.require_contact_email;
        let (invoice, party) = self
            .books
            .atomically(|books| lifecycle::mark_sent(books, id, require_email, now))?;
        info!(invoice_id = %id, recipient = party.email.as_deref().unwrap_or("-"), "invoice sent");

        let document = InvoiceDocument::render(
            &invoice,
            &party,
            &self.config.notification.sender_address,
            &self.config.default_currency,
        );
        let delivery = match self.notifier.deliver(&document) {
            Ok(()) => Delivery::Delivered {
                recipient: document.recipient.clone(),
            },
            Err(err) => {
                warn!(invoice_id = %id, error = %err, "invoice delivery failed");
                let reason = err.to_string();
                let recorded = self.books.atomically(|books| {
                    books.emit(Event::NotificationFailed {
                        invoice_id: id,
                        reason: reason.clone(),
                        timestamp: now,
                    });
                    Ok(())
                });
                if let Err(e) = recorded {
                    warn!(invoice_id = %id, error = %e, "could not record delivery failure");
                }
                Delivery::Failed { reason }
            }
        };

        Ok(SendOutcome { invoice, delivery })
    }

    pub fn cancel_invoice(
        &self,
        id: InvoiceId,
        reason: Option<String>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Invoice> {
        let now = time_provider.now();
        let invoice = self
            .books
            .atomically(|books| lifecycle::cancel_invoice(books, id, reason, now))?;
        info!(invoice_id = %id, "invoice cancelled");
        Ok(invoice)
    }

    pub fn delete_invoice(&self, id: InvoiceId) -> Result<()> {
        self.books
            .atomically(|books| lifecycle::delete_invoice(books, id))?;
        info!(invoice_id = %id, "invoice deleted");
        Ok(())
    }

    pub fn attach_document(&self, id: InvoiceId, new: NewDocument) -> Result<AttachedDocument> {
        self.books
            .atomically(|books| lifecycle::attach_document(books, id, new))
    }

    pub fn documents(&self, id: InvoiceId) -> Result<Vec<AttachedDocument>> {
        self.books
            .read(|books| books.invoice(id).map(|inv| inv.documents.clone()))?
    }

    /// apply a payment as one atomic unit
    pub fn add_payment(
        &self,
        id: InvoiceId,
        request: PaymentRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        let now = time_provider.now();
        let receipt = self
            .books
            .atomically(|books| payments::apply_payment(books, id, request, now))?;
        if !receipt.replayed {
            info!(
                invoice_id = %id,
                payment_id = %receipt.payment.id,
                amount = %receipt.payment.amount,
                status = %receipt.invoice_status,
                remaining = %receipt.remaining,
                "payment applied"
            );
        }
        Ok(receipt)
    }

    /// overdue pass on `as_of`
    pub fn sweep_overdue(&self, as_of: NaiveDate) -> Result<Vec<OverdueInvoice>> {
        let grace = self.grace_days();
        let overdue = self
            .books
            .read(|books| reporting::sweep_overdue(books, as_of, grace))?;
        if !overdue.is_empty() {
            info!(%as_of, count = overdue.len(), "overdue invoices found");
        }
        Ok(overdue)
    }

    pub fn receivables_summary(&self, as_of: NaiveDate) -> Result<ReceivablesSummary> {
        let grace = self.grace_days();
        self.books
            .read(|books| reporting::receivables_summary(books, as_of, grace))?
    }

    // recurring operations

    pub fn create_recurring(&self, new: NewRecurringOperation) -> Result<RecurringOperation> {
        let op = self
            .books
            .atomically(|books| recurring::create_recurring(books, new))?;
        info!(operation_id = %op.id, next_due = %op.next_due_date, "recurring operation created");
        Ok(op)
    }

    pub fn recurring(&self, id: OperationId) -> Result<RecurringOperation> {
        self.books.read(|books| books.operation(id).cloned())?
    }

    pub fn set_recurring_active(&self, id: OperationId, is_active: bool) -> Result<RecurringOperation> {
        self.books
            .atomically(|books| recurring::set_recurring_active(books, id, is_active))
    }

    pub fn delete_recurring(&self, id: OperationId) -> Result<()> {
        self.books
            .atomically(|books| recurring::delete_recurring(books, id))
    }

    pub fn due_operations(&self, as_of: NaiveDate) -> Result<Vec<RecurringOperation>> {
        self.books
            .read(|books| recurring::due_operations(books, as_of))
    }

    /// on-demand execution of a single operation
    pub fn execute_operation(
        &self,
        id: OperationId,
        as_of: NaiveDate,
        time_provider: &SafeTimeProvider,
    ) -> Result<Execution> {
        let now = time_provider.now();
        let execution = self
            .books
            .atomically(|books| recurring::execute_operation(books, id, as_of, now))?;
        info!(
            operation_id = %id,
            occurrence = %execution.occurrence_date,
            next_due = %execution.next_due_date,
            "recurring operation executed on demand"
        );
        Ok(execution)
    }

    pub fn execute_due_operations(
        &self,
        as_of: NaiveDate,
        time_provider: &SafeTimeProvider,
    ) -> Result<ExecutionReport> {
        let report = recurring::execute_due_operations(&self.books, as_of, time_provider)?;
        info!(
            %as_of,
            executed = report.executed_count,
            due = report.total_due,
            failed = report.errors.len(),
            "due operations processed"
        );
        Ok(report)
    }

    // state

    /// drain events emitted since the last call
    pub fn take_events(&self) -> Result<Vec<Event>> {
        self.books.take_events()
    }

    pub fn to_json(&self) -> Result<String> {
        let snapshot = self.books.snapshot()?;
        snapshot
            .to_json_pretty()
            .map_err(|e| SuiteError::BooksUnavailable {
                message: e.to_string(),
            })
    }

    pub fn from_json(config: SuiteConfig, raw: &str) -> Result<Self> {
        let books = Books::from_json(raw).map_err(|e| SuiteError::InvalidConfiguration {
            message: format!("books snapshot: {}", e),
        })?;
        Ok(Self::with_books(config, books))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Percentage};
    use crate::errors::ErrorKind;
    use crate::invoicing::{LineInput, OutboxNotifier};
    use crate::types::{AccountType, CoreStatus, InvoiceStatus, InvoiceType, ThirdPartyType};
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    struct BrokenMailer;

    impl InvoiceNotifier for BrokenMailer {
        fn deliver(&self, _document: &InvoiceDocument) -> Result<()> {
            Err(SuiteError::NotificationFailed {
                message: "smtp unreachable".to_string(),
            })
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()))
    }

    fn client(suite: &Suite, email: Option<&str>) -> ThirdParty {
        suite
            .register_third_party(NewThirdParty {
                name: "Hôtel Colbert".to_string(),
                party_type: ThirdPartyType::Client,
                details: None,
                email: email.map(str::to_string),
            })
            .unwrap()
    }

    fn draft(party: &ThirdParty) -> InvoiceDraft {
        InvoiceDraft {
            invoice_type: InvoiceType::Client,
            third_party_id: party.id,
            invoice_number: None,
            issue_date: date(2024, 3, 1),
            due_date: date(2024, 3, 15),
            payment_terms: None,
            lines: vec![LineInput {
                designation: "Maintenance".to_string(),
                quantity: dec!(1),
                unit_price: Money::from_major(1000),
                tax_rate: Some(Percentage::ZERO),
                discount: None,
            }],
        }
    }

    #[test]
    fn test_send_delivers_rendered_invoice() {
        let outbox = Arc::new(OutboxNotifier::new());
        let suite = Suite::new(SuiteConfig::default()).with_notifier(outbox.clone());
        let time = clock();
        let party = client(&suite, Some("direction@colbert.mg"));
        let invoice = suite.create_invoice(draft(&party), &time).unwrap();

        let outcome = suite.send_invoice(invoice.id, &time).unwrap();

        assert_eq!(outcome.invoice.status, CoreStatus::Envoye);
        assert_eq!(
            outcome.delivery,
            Delivery::Delivered { recipient: Some("direction@colbert.mg".to_string()) }
        );
        assert_eq!(outbox.sent()[0].invoice_number, "FAC-2024-0001");
    }

    #[test]
    fn test_failed_delivery_keeps_invoice_sent() {
        let suite = Suite::new(SuiteConfig::default()).with_notifier(Arc::new(BrokenMailer));
        let time = clock();
        let party = client(&suite, Some("direction@colbert.mg"));
        let invoice = suite.create_invoice(draft(&party), &time).unwrap();
        suite.take_events().unwrap();

        let outcome = suite.send_invoice(invoice.id, &time).unwrap();

        assert!(matches!(outcome.delivery, Delivery::Failed { .. }));
        assert_eq!(suite.invoice(invoice.id).unwrap().status, CoreStatus::Envoye);
        let events = suite.take_events().unwrap();
        assert!(events.iter().any(|e| matches!(e, Event::NotificationFailed { .. })));
    }

    #[test]
    fn test_send_without_email_is_rejected_by_default() {
        let suite = Suite::new(SuiteConfig::default());
        let time = clock();
        let party = client(&suite, None);
        let invoice = suite.create_invoice(draft(&party), &time).unwrap();

        let err = suite.send_invoice(invoice.id, &time).unwrap_err();
        assert!(matches!(err, SuiteError::MissingContactEmail { .. }));
        assert_eq!(suite.invoice(invoice.id).unwrap().status, CoreStatus::Brouillon);
    }

    #[test]
    fn test_overdue_view_follows_the_clock() {
        let suite = Suite::new(SuiteConfig::default());
        let time = clock();
        let party = client(&suite, Some("direction@colbert.mg"));
        let invoice = suite.create_invoice(draft(&party), &time).unwrap();
        suite.send_invoice(invoice.id, &time).unwrap();

        let control = time.test_control().unwrap();
        control.advance(Duration::days(20));
        let today = time.now().date_naive();

        let view = suite.invoice_view(invoice.id, today).unwrap();
        assert_eq!(view.display_status, InvoiceStatus::EnRetard);
        assert_eq!(suite.sweep_overdue(today).unwrap().len(), 1);
        assert_eq!(
            suite.receivables_summary(today).unwrap().receivables.overdue_amount,
            Money::from_major(1000)
        );
    }

    #[test]
    fn test_json_state_roundtrip() {
        let suite = Suite::new(SuiteConfig::default());
        let account = suite
            .open_account(NewAccount {
                name: "Caisse".to_string(),
                account_type: AccountType::Especes,
                currency: None,
                opening_balance: Money::from_major(50),
            })
            .unwrap();

        let raw = suite.to_json().unwrap();
        let restored = Suite::from_json(SuiteConfig::default(), &raw).unwrap();
        assert_eq!(restored.account(account.id).unwrap().balance, Money::from_major(50));
    }

    #[test]
    fn test_oversized_invoice_is_rejected_and_books_stay_usable() {
        let suite = Suite::new(SuiteConfig::default());
        let time = clock();
        let party = client(&suite, None);

        let mut huge = draft(&party);
        huge.lines[0].quantity = dec!(1_000_000_000_000_000);
        huge.lines[0].unit_price = Money::from_major(1_000_000_000_000_000);
        let err = suite.create_invoice(huge, &time).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(suite.third_party(party.id).unwrap().name, "Hôtel Colbert");
        let invoice = suite.create_invoice(draft(&party), &time).unwrap();
        assert_eq!(invoice.invoice_number.as_deref(), Some("FAC-2024-0001"));
    }
}
