use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::decimal::Money;
use crate::types::{
    AccountId, CoreStatus, FlowType, InvoiceId, InvoiceType, OperationId, PaymentId, TransactionId,
};

/// all events that can be emitted while mutating the books
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // ledger events
    TransactionRecorded {
        transaction_id: TransactionId,
        account_id: AccountId,
        flow: FlowType,
        amount: Money,
        new_balance: Money,
        transaction_date: NaiveDate,
    },
    TransactionReversed {
        transaction_id: TransactionId,
        account_id: AccountId,
        amount: Money,
        new_balance: Money,
    },

    // invoice events
    InvoiceCreated {
        invoice_id: InvoiceId,
        invoice_type: InvoiceType,
        invoice_number: String,
        total_amount: Money,
        timestamp: DateTime<Utc>,
    },
    InvoiceSent {
        invoice_id: InvoiceId,
        recipient: Option<String>,
        timestamp: DateTime<Utc>,
    },
    InvoiceStatusChanged {
        invoice_id: InvoiceId,
        old_status: CoreStatus,
        new_status: CoreStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    NotificationFailed {
        invoice_id: InvoiceId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentApplied {
        invoice_id: InvoiceId,
        payment_id: PaymentId,
        transaction_id: TransactionId,
        amount: Money,
        amount_paid: Money,
        remaining: Money,
        payment_date: NaiveDate,
    },

    // recurring operation events
    RecurringOperationExecuted {
        operation_id: OperationId,
        transaction_id: TransactionId,
        occurrence_date: NaiveDate,
        next_due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    RecurringOperationFailed {
        operation_id: OperationId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// pending events kept until a caller drains them with `take_events`
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// bounded buffer of pending events; once full the oldest are discarded
#[derive(Debug, Clone)]
pub struct EventStore {
    events: VecDeque<Event>,
    capacity: usize,
    dropped: u64,
}

impl EventStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn emit(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    /// move every event of `other` to the back of this store
    pub fn append(&mut self, other: EventStore) {
        self.dropped += other.dropped;
        for event in other.events {
            self.emit(event);
        }
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// empty store with the same capacity
    pub fn detached(&self) -> Self {
        Self::with_capacity(self.capacity)
    }

    pub fn events(&self) -> &VecDeque<Event> {
        &self.events
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// events discarded because nobody drained the store in time
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn failed(reason: &str) -> Event {
        Event::RecurringOperationFailed {
            operation_id: Uuid::nil(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_store_keeps_the_most_recent_events() {
        let mut store = EventStore::with_capacity(3);
        for i in 0..5 {
            store.emit(failed(&i.to_string()));
        }

        assert_eq!(store.len(), 3);
        assert_eq!(store.dropped(), 2);
        let reasons: Vec<String> = store
            .take_events()
            .into_iter()
            .map(|e| match e {
                Event::RecurringOperationFailed { reason, .. } => reason,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(reasons, vec!["2", "3", "4"]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_respects_capacity() {
        let mut store = EventStore::with_capacity(2);
        store.emit(failed("a"));
        let mut other = store.detached();
        other.emit(failed("b"));
        other.emit(failed("c"));

        store.append(other);
        assert_eq!(store.len(), 2);
        assert_eq!(store.dropped(), 1);
        assert_eq!(store.capacity(), 2);
    }
}
