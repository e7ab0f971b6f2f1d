use chrono::{Datelike, NaiveDate};

use crate::books::Books;
use crate::config::NumberingConfig;
use crate::errors::{Result, SuiteError};
use crate::types::InvoiceType;

/// pick the number an invoice is filed under
///
/// An explicit number is kept as long as nobody else holds it. Otherwise the
/// per type/year sequence is bumped, skipping values already taken by
/// explicit numbers, so the allocator never hands out a duplicate.
pub fn assign_number(
    books: &mut Books,
    numbering: &NumberingConfig,
    invoice_type: InvoiceType,
    issue_date: NaiveDate,
    explicit: Option<&str>,
) -> Result<String> {
    if let Some(number) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        if books.invoice_number_taken(number) {
            return Err(SuiteError::DuplicateInvoiceNumber {
                number: number.to_string(),
            });
        }
        return Ok(number.to_string());
    }

    let year = issue_date.year();
    loop {
        let sequence = books.next_sequence(invoice_type, year);
        let candidate = numbering.format(invoice_type, year, sequence);
        if !books.invoice_number_taken(&candidate) {
            return Ok(candidate);
        }
    }
}
