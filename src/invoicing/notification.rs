//! Rendering and delivery of a sent invoice.
//!
//! Delivery (email with the rendered document attached) belongs to an
//! external service. The suite only renders the document and hands it to an
//! [`InvoiceNotifier`]; a failed delivery is reported, never rolled back.

use std::fmt::Write as _;
use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

use crate::errors::{Result, SuiteError};
use crate::invoicing::Invoice;
use crate::parties::ThirdParty;
use crate::types::InvoiceId;

/// what goes out when an invoice is sent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceDocument {
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub sender: String,
    pub recipient: Option<String>,
    pub subject: String,
    /// file name of the rendered attachment
    pub attachment_name: String,
    pub body: String,
}

impl InvoiceDocument {
    pub fn render(invoice: &Invoice, party: &ThirdParty, sender: &str, currency: &str) -> Self {
        let number = invoice.invoice_number.clone().unwrap_or_default();

        let mut body = String::new();
        // writing into a String cannot fail
        let _ = writeln!(body, "Facture {}", number);
        let _ = writeln!(body, "Destinataire: {}", party.name);
        if let Some(details) = &party.details {
            let _ = writeln!(body, "{}", details);
        }
        let _ = writeln!(body, "Date: {}  Echeance: {}", invoice.issue_date, invoice.due_date);
        let _ = writeln!(body);
        for line in &invoice.lines {
            let _ = writeln!(
                body,
                "{} | {} x {} | remise {} | TVA {} | {}",
                line.designation,
                line.quantity,
                line.unit_price,
                line.discount,
                line.tax_rate,
                line.line_total
            );
        }
        let _ = writeln!(body);
        let _ = writeln!(body, "Sous-total: {} {}", invoice.subtotal, currency);
        let _ = writeln!(body, "Taxes: {} {}", invoice.tax_amount, currency);
        let _ = writeln!(body, "Total: {} {}", invoice.total_amount, currency);
        if let Some(terms) = &invoice.payment_terms {
            let _ = writeln!(body, "Conditions: {}", terms);
        }

        Self {
            invoice_id: invoice.id,
            subject: format!("Facture {}", number),
            attachment_name: format!("{}.pdf", number),
            invoice_number: number,
            sender: sender.to_string(),
            recipient: party.email.clone(),
            body,
        }
    }
}

/// delivery seam for sent invoices
pub trait InvoiceNotifier: Send + Sync {
    fn deliver(&self, document: &InvoiceDocument) -> Result<()>;
}

/// writes deliveries to the log, used when no mail service is wired in
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl InvoiceNotifier for LogNotifier {
    fn deliver(&self, document: &InvoiceDocument) -> Result<()> {
        info!(
            invoice_id = %document.invoice_id,
            invoice_number = %document.invoice_number,
            recipient = document.recipient.as_deref().unwrap_or("-"),
            attachment = %document.attachment_name,
            "invoice delivered"
        );
        Ok(())
    }
}

/// keeps every delivered document in memory
#[derive(Debug, Default)]
pub struct OutboxNotifier {
    sent: Mutex<Vec<InvoiceDocument>>,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<InvoiceDocument> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl InvoiceNotifier for OutboxNotifier {
    fn deliver(&self, document: &InvoiceDocument) -> Result<()> {
        let mut sent = self.sent.lock().map_err(|e| SuiteError::NotificationFailed {
            message: e.to_string(),
        })?;
        sent.push(document.clone());
        Ok(())
    }
}
