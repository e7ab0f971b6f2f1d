use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::decimal::{Money, Percentage};
use crate::types::{CoreStatus, FlowType};

/// error category surfaced to callers and the http boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// bad or missing input, range violations
    Validation,
    /// illegal state transition, overpayment, double booking
    Conflict,
    /// missing referenced entity
    NotFound,
    /// external collaborator failure (notification, export)
    Dependency,
    Internal,
}

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("invalid amount for {field}: {value}")]
    InvalidAmount {
        field: String,
        value: String,
    },

    #[error("amount {value} has more than {scale} decimal places")]
    TooPrecise {
        value: Decimal,
        scale: u32,
    },

    #[error("{context} is too large to be computed")]
    AmountOverflow {
        context: &'static str,
    },

    #[error("line {line}: quantity must be greater than zero, got {quantity}")]
    InvalidQuantity {
        line: usize,
        quantity: Decimal,
    },

    #[error("line {line}: unit price must not be negative, got {unit_price}")]
    NegativeUnitPrice {
        line: usize,
        unit_price: Money,
    },

    #[error("line {line}: {field} must be within [0, 100], got {value}")]
    PercentageOutOfRange {
        line: usize,
        field: &'static str,
        value: Percentage,
    },

    #[error("an invoice needs at least one line")]
    EmptyInvoice,

    #[error("missing required field: {field}")]
    MissingField {
        field: &'static str,
    },

    #[error("invalid email address: {value}")]
    InvalidEmail {
        value: String,
    },

    #[error("due date {due_date} is before issue date {issue_date}")]
    DueBeforeIssue {
        issue_date: chrono::NaiveDate,
        due_date: chrono::NaiveDate,
    },

    #[error("invoice {number} is numbered in {year}, its issue date must stay in that year")]
    IssueYearLocked {
        number: String,
        year: i32,
    },

    #[error("due day must be within 1..=31, got {due_day}")]
    InvalidDueDay {
        due_day: u32,
    },

    #[error("{field} type {actual:?} does not match expected {expected:?}")]
    FlowTypeMismatch {
        field: &'static str,
        expected: FlowType,
        actual: FlowType,
    },

    #[error("third party {id} is a {actual} and cannot be used on a {invoice_type} invoice")]
    ThirdPartyRoleMismatch {
        id: Uuid,
        actual: String,
        invoice_type: String,
    },

    #[error("payment amount must be greater than zero, got {amount}")]
    NonPositivePayment {
        amount: Money,
    },

    #[error("payment of {requested} exceeds remaining balance {remaining}")]
    Overpayment {
        remaining: Money,
        requested: Money,
    },

    #[error("cannot {action} an invoice in status {status}")]
    IllegalTransition {
        action: &'static str,
        status: CoreStatus,
    },

    #[error("invoice number {number} is already in use")]
    DuplicateInvoiceNumber {
        number: String,
    },

    #[error("idempotency key {key} was already used for a different payment")]
    IdempotencyKeyReused {
        key: String,
    },

    #[error("recurring operation {id} is not active")]
    OperationInactive {
        id: Uuid,
    },

    #[error("recurring operation {id} is not due until {next_due_date}")]
    OperationNotDue {
        id: Uuid,
        next_due_date: chrono::NaiveDate,
    },

    #[error("{entity} {id} is still referenced by {referenced_by}")]
    StillReferenced {
        entity: &'static str,
        id: Uuid,
        referenced_by: &'static str,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("third party {id} has no contact email")]
    MissingContactEmail {
        id: Uuid,
    },

    #[error("notification failed: {message}")]
    NotificationFailed {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("books are unavailable: {message}")]
    BooksUnavailable {
        message: String,
    },

    #[error("calendar overflow while advancing {from}")]
    CalendarOverflow {
        from: chrono::NaiveDate,
    },
}

impl SuiteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SuiteError::InvalidAmount { .. }
            | SuiteError::TooPrecise { .. }
            | SuiteError::AmountOverflow { .. }
            | SuiteError::InvalidQuantity { .. }
            | SuiteError::NegativeUnitPrice { .. }
            | SuiteError::PercentageOutOfRange { .. }
            | SuiteError::EmptyInvoice
            | SuiteError::MissingField { .. }
            | SuiteError::InvalidEmail { .. }
            | SuiteError::DueBeforeIssue { .. }
            | SuiteError::IssueYearLocked { .. }
            | SuiteError::InvalidDueDay { .. }
            | SuiteError::FlowTypeMismatch { .. }
            | SuiteError::ThirdPartyRoleMismatch { .. }
            | SuiteError::NonPositivePayment { .. }
            | SuiteError::Overpayment { .. }
            | SuiteError::MissingContactEmail { .. }
            | SuiteError::InvalidConfiguration { .. } => ErrorKind::Validation,

            SuiteError::IllegalTransition { .. }
            | SuiteError::DuplicateInvoiceNumber { .. }
            | SuiteError::IdempotencyKeyReused { .. }
            | SuiteError::OperationInactive { .. }
            | SuiteError::OperationNotDue { .. }
            | SuiteError::StillReferenced { .. } => ErrorKind::Conflict,

            SuiteError::NotFound { .. } => ErrorKind::NotFound,

            SuiteError::NotificationFailed { .. } => ErrorKind::Dependency,

            SuiteError::BooksUnavailable { .. } | SuiteError::CalendarOverflow { .. } => {
                ErrorKind::Internal
            }
        }
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        SuiteError::NotFound { entity, id }
    }
}

pub type Result<T> = std::result::Result<T, SuiteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overpayment_is_a_validation_error() {
        let err = SuiteError::Overpayment {
            remaining: Money::from_major(1000),
            requested: Money::from_minor(100_001),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "payment of 1000.01 exceeds remaining balance 1000.00"
        );
    }

    #[test]
    fn test_kinds() {
        let transition = SuiteError::IllegalTransition {
            action: "cancel",
            status: CoreStatus::Paye,
        };
        assert_eq!(transition.kind(), ErrorKind::Conflict);
        assert_eq!(transition.to_string(), "cannot cancel an invoice in status paye");

        assert_eq!(SuiteError::not_found("invoice", Uuid::nil()).kind(), ErrorKind::NotFound);
        assert_eq!(
            SuiteError::NotificationFailed { message: "smtp down".into() }.kind(),
            ErrorKind::Dependency
        );
    }
}
