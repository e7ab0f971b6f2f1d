pub mod books;
pub mod cli;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod http;
pub mod invoicing;
pub mod ledger;
pub mod parties;
pub mod payments;
pub mod recurring;
pub mod suite;
pub mod types;

// re-export key types
pub use books::{Books, SharedBooks};
pub use config::SuiteConfig;
pub use decimal::{Money, Percentage};
pub use errors::{ErrorKind, Result, SuiteError};
pub use events::{Event, EventStore};
pub use invoicing::{
    Invoice, InvoiceDraft, InvoiceFilter, InvoiceNotifier, InvoiceUpdate, InvoiceView, LineInput,
};
pub use ledger::{Account, NewAccount, NewCategory, NewTransaction, Transaction};
pub use parties::{NewThirdParty, ThirdParty};
pub use payments::{PaymentReceipt, PaymentRequest};
pub use recurring::{ExecutionReport, NewRecurringOperation, RecurringOperation};
pub use suite::{Delivery, SendOutcome, Suite};
pub use types::{
    AccountType, CoreStatus, FlowType, Frequency, InvoiceStatus, InvoiceType, ThirdPartyType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
