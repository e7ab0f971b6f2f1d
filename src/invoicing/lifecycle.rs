use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::books::Books;
use crate::config::NumberingConfig;
use crate::errors::{Result, SuiteError};
use crate::events::Event;
use crate::invoicing::invoice::{AttachedDocument, Invoice, InvoiceLine};
use crate::invoicing::lines::{calculate, InvoiceTotals, LineInput};
use crate::invoicing::numbering::assign_number;
use crate::parties::ThirdParty;
use crate::types::{CoreStatus, InvoiceId, InvoiceType, ThirdPartyId};

/// input of invoice creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    pub third_party_id: ThirdPartyId,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub payment_terms: Option<String>,
    pub lines: Vec<LineInput>,
}

/// replacement content of a draft; type and number stay fixed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceUpdate {
    pub third_party_id: ThirdPartyId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub payment_terms: Option<String>,
    pub lines: Vec<LineInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub file_path: String,
    pub file_name: String,
    #[serde(default)]
    pub file_type: Option<String>,
}

fn check_dates(issue_date: NaiveDate, due_date: NaiveDate) -> Result<()> {
    if due_date < issue_date {
        return Err(SuiteError::DueBeforeIssue {
            issue_date,
            due_date,
        });
    }
    Ok(())
}

fn check_counterparty(books: &Books, id: ThirdPartyId, invoice_type: InvoiceType) -> Result<()> {
    books.third_party(id)?.check_role(invoice_type)
}

fn build_lines(inputs: &[LineInput]) -> Result<(Vec<InvoiceLine>, InvoiceTotals)> {
    let calc = calculate(inputs)?;
    let lines = inputs
        .iter()
        .zip(calc.lines)
        .map(|(input, amounts)| InvoiceLine::from_input(input, amounts))
        .collect();
    Ok((lines, calc.totals))
}

fn clean(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// move an invoice to `new_status`, returning the event to record
pub(crate) fn change_status(
    invoice: &mut Invoice,
    new_status: CoreStatus,
    reason: &str,
    now: DateTime<Utc>,
) -> Option<Event> {
    if invoice.status == new_status {
        return None;
    }
    let old_status = invoice.status;
    invoice.status = new_status;
    invoice.updated_at = now;
    Some(Event::InvoiceStatusChanged {
        invoice_id: invoice.id,
        old_status,
        new_status,
        reason: reason.to_string(),
        timestamp: now,
    })
}

/// create a draft invoice, computing totals and allocating its number
pub fn create_invoice(
    books: &mut Books,
    numbering: &NumberingConfig,
    draft: InvoiceDraft,
    now: DateTime<Utc>,
) -> Result<Invoice> {
    check_dates(draft.issue_date, draft.due_date)?;
    check_counterparty(books, draft.third_party_id, draft.invoice_type)?;
    let (lines, totals) = build_lines(&draft.lines)?;
    let number = assign_number(
        books,
        numbering,
        draft.invoice_type,
        draft.issue_date,
        draft.invoice_number.as_deref(),
    )?;

    let invoice = Invoice {
        id: Uuid::new_v4(),
        invoice_type: draft.invoice_type,
        third_party_id: draft.third_party_id,
        invoice_number: Some(number.clone()),
        issue_date: draft.issue_date,
        due_date: draft.due_date,
        subtotal: totals.subtotal,
        tax_amount: totals.tax_amount,
        total_amount: totals.total_amount,
        amount_paid: Default::default(),
        status: CoreStatus::Brouillon,
        payment_terms: clean(draft.payment_terms),
        lines,
        payments: Vec::new(),
        documents: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    books.invoices.insert(invoice.id, invoice.clone());
    books.emit(Event::InvoiceCreated {
        invoice_id: invoice.id,
        invoice_type: invoice.invoice_type,
        invoice_number: number,
        total_amount: invoice.total_amount,
        timestamp: now,
    });
    Ok(invoice)
}

/// replace the content of a draft and recompute its totals
pub fn update_draft(
    books: &mut Books,
    id: InvoiceId,
    update: InvoiceUpdate,
    now: DateTime<Utc>,
) -> Result<Invoice> {
    let current = books.invoice(id)?;
    if current.status != CoreStatus::Brouillon {
        return Err(SuiteError::IllegalTransition {
            action: "edit",
            status: current.status,
        });
    }
    let invoice_type = current.invoice_type;
    check_dates(update.issue_date, update.due_date)?;
    if update.issue_date.year() != current.issue_date.year() {
        if let Some(number) = &current.invoice_number {
            return Err(SuiteError::IssueYearLocked {
                number: number.clone(),
                year: current.issue_date.year(),
            });
        }
    }
    check_counterparty(books, update.third_party_id, invoice_type)?;
    let (lines, totals) = build_lines(&update.lines)?;

    let invoice = books.invoice_mut(id)?;
    invoice.third_party_id = update.third_party_id;
    invoice.issue_date = update.issue_date;
    invoice.due_date = update.due_date;
    invoice.payment_terms = clean(update.payment_terms);
    invoice.lines = lines;
    invoice.apply_totals(totals);
    invoice.updated_at = now;
    Ok(invoice.clone())
}

/// brouillon -> envoye, or straight to paye when nothing is owed
///
/// Returns the invoice together with its counterparty so the caller can
/// render and deliver the document once the change is committed.
pub fn mark_sent(
    books: &mut Books,
    id: InvoiceId,
    require_contact_email: bool,
    now: DateTime<Utc>,
) -> Result<(Invoice, ThirdParty)> {
    let current = books.invoice(id)?;
    if current.status != CoreStatus::Brouillon {
        return Err(SuiteError::IllegalTransition {
            action: "send",
            status: current.status,
        });
    }
    let party = books.third_party(current.third_party_id)?.clone();
    if require_contact_email && party.email.is_none() {
        return Err(SuiteError::MissingContactEmail { id: party.id });
    }

    let invoice = books.invoice_mut(id)?;
    let changed = if invoice.total_amount.is_zero() {
        change_status(invoice, CoreStatus::Paye, "sent with nothing due", now)
    } else {
        change_status(invoice, CoreStatus::Envoye, "sent", now)
    };
    let invoice = invoice.clone();
    if let Some(event) = changed {
        books.emit(event);
    }
    books.emit(Event::InvoiceSent {
        invoice_id: id,
        recipient: party.email.clone(),
        timestamp: now,
    });
    Ok((invoice, party))
}

/// any state except paye and annule -> annule
pub fn cancel_invoice(
    books: &mut Books,
    id: InvoiceId,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<Invoice> {
    let invoice = books.invoice_mut(id)?;
    if invoice.status.is_terminal() {
        return Err(SuiteError::IllegalTransition {
            action: "cancel",
            status: invoice.status,
        });
    }
    let reason = clean(reason).unwrap_or_else(|| "cancelled".to_string());
    let changed = change_status(invoice, CoreStatus::Annule, &reason, now);
    let invoice = invoice.clone();
    if let Some(event) = changed {
        books.emit(event);
    }
    Ok(invoice)
}

/// drop a draft or cancelled invoice with its lines, payments and documents;
/// transactions created by its payments stay in the ledger
pub fn delete_invoice(books: &mut Books, id: InvoiceId) -> Result<()> {
    let invoice = books.invoice(id)?;
    if !matches!(invoice.status, CoreStatus::Brouillon | CoreStatus::Annule) {
        return Err(SuiteError::IllegalTransition {
            action: "delete",
            status: invoice.status,
        });
    }
    let key_prefix = format!("{}:", id);
    books.payment_keys.retain(|key, _| !key.starts_with(&key_prefix));
    books.invoices.remove(&id);
    Ok(())
}

pub fn attach_document(
    books: &mut Books,
    id: InvoiceId,
    new: NewDocument,
) -> Result<AttachedDocument> {
    let file_path = new.file_path.trim();
    if file_path.is_empty() {
        return Err(SuiteError::MissingField { field: "file_path" });
    }
    let file_name = new.file_name.trim();
    if file_name.is_empty() {
        return Err(SuiteError::MissingField { field: "file_name" });
    }
    let file_type = clean(new.file_type).unwrap_or_else(|| {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    });

    let document = AttachedDocument {
        id: Uuid::new_v4(),
        invoice_id: id,
        file_path: file_path.to_string(),
        file_name: file_name.to_string(),
        file_type,
    };
    books.invoice_mut(id)?.documents.push(document.clone());
    Ok(document)
}
