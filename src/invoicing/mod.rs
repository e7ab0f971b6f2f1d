pub mod invoice;
pub mod lifecycle;
pub mod lines;
pub mod notification;
pub mod numbering;
pub mod reporting;

pub use invoice::{AttachedDocument, Invoice, InvoiceLine, InvoicePayment, InvoiceView};
pub use lifecycle::{InvoiceDraft, InvoiceUpdate, NewDocument};
pub use lines::{calculate, Calculation, InvoiceTotals, LineAmounts, LineInput};
pub use notification::{InvoiceDocument, InvoiceNotifier, LogNotifier, OutboxNotifier};
pub use reporting::{Exposure, InvoiceFilter, OverdueInvoice, ReceivablesSummary};
