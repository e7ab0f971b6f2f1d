//! In-process relational state of the suite.
//!
//! Every mutation goes through [`SharedBooks::atomically`], which runs the
//! closure against a working copy and only publishes it when the closure
//! succeeds. That is the transactional boundary around payment application
//! and recurring-operation execution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{Result, SuiteError};
use crate::events::{Event, EventStore};
use crate::invoicing::Invoice;
use crate::ledger::{Account, Transaction, TransactionCategory};
use crate::parties::ThirdParty;
use crate::recurring::RecurringOperation;
use crate::types::{
    AccountId, CategoryId, InvoiceId, InvoiceType, OperationId, PaymentId, ThirdPartyId,
    TransactionId,
};

/// all persisted records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Books {
    pub accounts: BTreeMap<AccountId, Account>,
    pub categories: BTreeMap<CategoryId, TransactionCategory>,
    pub transactions: BTreeMap<TransactionId, Transaction>,
    pub third_parties: BTreeMap<ThirdPartyId, ThirdParty>,
    pub invoices: BTreeMap<InvoiceId, Invoice>,
    pub operations: BTreeMap<OperationId, RecurringOperation>,
    /// last allocated invoice sequence, keyed by `{type}:{year}`
    pub sequences: BTreeMap<String, u32>,
    /// payments already applied, keyed by `{invoice_id}:{idempotency_key}`
    pub payment_keys: BTreeMap<String, PaymentId>,
    #[serde(skip)]
    pub events: EventStore,
}

impl Books {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }

    /// resize the pending event buffer, keeping the newest events
    pub fn set_event_capacity(&mut self, capacity: usize) {
        let mut events = EventStore::with_capacity(capacity);
        events.append(std::mem::take(&mut self.events));
        self.events = events;
    }

    pub fn account(&self, id: AccountId) -> Result<&Account> {
        self.accounts
            .get(&id)
            .ok_or(SuiteError::not_found("account", id))
    }

    pub fn account_mut(&mut self, id: AccountId) -> Result<&mut Account> {
        self.accounts
            .get_mut(&id)
            .ok_or(SuiteError::not_found("account", id))
    }

    pub fn category(&self, id: CategoryId) -> Result<&TransactionCategory> {
        self.categories
            .get(&id)
            .ok_or(SuiteError::not_found("transaction category", id))
    }

    pub fn transaction(&self, id: TransactionId) -> Result<&Transaction> {
        self.transactions
            .get(&id)
            .ok_or(SuiteError::not_found("transaction", id))
    }

    pub fn third_party(&self, id: ThirdPartyId) -> Result<&ThirdParty> {
        self.third_parties
            .get(&id)
            .ok_or(SuiteError::not_found("third party", id))
    }

    pub fn invoice(&self, id: InvoiceId) -> Result<&Invoice> {
        self.invoices
            .get(&id)
            .ok_or(SuiteError::not_found("invoice", id))
    }

    pub fn invoice_mut(&mut self, id: InvoiceId) -> Result<&mut Invoice> {
        self.invoices
            .get_mut(&id)
            .ok_or(SuiteError::not_found("invoice", id))
    }

    pub fn operation(&self, id: OperationId) -> Result<&RecurringOperation> {
        self.operations
            .get(&id)
            .ok_or(SuiteError::not_found("recurring operation", id))
    }

    pub fn operation_mut(&mut self, id: OperationId) -> Result<&mut RecurringOperation> {
        self.operations
            .get_mut(&id)
            .ok_or(SuiteError::not_found("recurring operation", id))
    }

    /// bump and return the next sequence number for a type and year
    pub fn next_sequence(&mut self, invoice_type: InvoiceType, year: i32) -> u32 {
        let counter = self
            .sequences
            .entry(format!("{}:{}", invoice_type, year))
            .or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn invoice_number_taken(&self, number: &str) -> bool {
        self.invoices
            .values()
            .any(|inv| inv.invoice_number.as_deref() == Some(number))
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// cloneable handle to the books shared between callers
#[derive(Debug, Clone, Default)]
pub struct SharedBooks(Arc<Mutex<Books>>);

impl SharedBooks {
    pub fn new(books: Books) -> Self {
        Self(Arc::new(Mutex::new(books)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Books>> {
        self.0.lock().map_err(|e| SuiteError::BooksUnavailable {
            message: e.to_string(),
        })
    }

    /// run `f` as one all-or-nothing unit of work
    ///
    /// pending events stay out of the working copy; only the events emitted
    /// by `f` are appended to them on success
    pub fn atomically<T>(&self, f: impl FnOnce(&mut Books) -> Result<T>) -> Result<T> {
        let mut committed = self.lock()?;
        let detached = committed.events.detached();
        let pending = std::mem::replace(&mut committed.events, detached);
        let mut working = committed.clone();
        committed.events = pending;

        let value = f(&mut working)?;

        let mut events = std::mem::take(&mut committed.events);
        events.append(std::mem::take(&mut working.events));
        working.events = events;
        *committed = working;
        Ok(value)
    }

    /// read-only access to the committed state
    pub fn read<T>(&self, f: impl FnOnce(&Books) -> T) -> Result<T> {
        let committed = self.lock()?;
        Ok(f(&committed))
    }

    pub fn take_events(&self) -> Result<Vec<Event>> {
        let mut committed = self.lock()?;
        Ok(committed.events.take_events())
    }

    pub fn snapshot(&self) -> Result<Books> {
        self.read(|books| books.clone())
    }
}
