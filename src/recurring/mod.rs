pub mod executor;
pub mod schedule;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::books::Books;
use crate::decimal::Money;
use crate::errors::{Result, SuiteError};
use crate::ledger::check_category;
use crate::types::{AccountId, CategoryId, FlowType, Frequency, OperationId};

pub use executor::{execute_due_operations, execute_operation, Execution, ExecutionReport, OperationError};

/// template that periodically produces a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringOperation {
    pub id: OperationId,
    pub description: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub amount: Money,
    pub frequency: Frequency,
    /// 1..=31, clamped to the month length when scheduling
    pub due_day: u32,
    pub account_id: Option<AccountId>,
    #[serde(rename = "transaction_category_id")]
    pub category_id: Option<CategoryId>,
    pub next_due_date: NaiveDate,
    pub is_active: bool,
    pub last_executed_at: Option<DateTime<Utc>>,
}

impl RecurringOperation {
    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.is_active && self.next_due_date <= as_of
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecurringOperation {
    pub description: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub amount: Money,
    pub frequency: Frequency,
    pub due_day: u32,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default, rename = "transaction_category_id")]
    pub category_id: Option<CategoryId>,
    pub next_due_date: NaiveDate,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

/// register an operation; the first due date is moved onto the due day
pub fn create_recurring(books: &mut Books, new: NewRecurringOperation) -> Result<RecurringOperation> {
    let description = new.description.trim();
    if description.is_empty() {
        return Err(SuiteError::MissingField { field: "description" });
    }
    if !new.amount.is_positive() {
        return Err(SuiteError::InvalidAmount {
            field: "amount".to_string(),
            value: new.amount.to_string(),
        });
    }
    if !(1..=31).contains(&new.due_day) {
        return Err(SuiteError::InvalidDueDay { due_day: new.due_day });
    }
    if let Some(account_id) = new.account_id {
        books.account(account_id)?;
    }
    check_category(books, new.category_id, new.flow)?;

    let operation = RecurringOperation {
        id: Uuid::new_v4(),
        description: description.to_string(),
        flow: new.flow,
        amount: new.amount,
        frequency: new.frequency,
        due_day: new.due_day,
        account_id: new.account_id,
        category_id: new.category_id,
        next_due_date: schedule::clamp_to_due_day(new.next_due_date, new.due_day)?,
        is_active: new.is_active,
        last_executed_at: None,
    };
    books.operations.insert(operation.id, operation.clone());
    Ok(operation)
}

pub fn set_recurring_active(
    books: &mut Books,
    id: OperationId,
    is_active: bool,
) -> Result<RecurringOperation> {
    let operation = books.operation_mut(id)?;
    operation.is_active = is_active;
    Ok(operation.clone())
}

/// transactions already produced by the operation are kept
pub fn delete_recurring(books: &mut Books, id: OperationId) -> Result<()> {
    books
        .operations
        .remove(&id)
        .map(|_| ())
        .ok_or(SuiteError::not_found("recurring operation", id))
}

/// active operations due on or before `as_of`, oldest due first then by id
pub fn due_operations(books: &Books, as_of: NaiveDate) -> Vec<RecurringOperation> {
    let mut due: Vec<RecurringOperation> = books
        .operations
        .values()
        .filter(|op| op.is_due(as_of))
        .cloned()
        .collect();
    due.sort_by(|a, b| (a.next_due_date, a.id).cmp(&(b.next_due_date, b.id)));
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::ledger::{create_category, NewCategory};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_op(due_day: u32, next_due_date: NaiveDate) -> NewRecurringOperation {
        NewRecurringOperation {
            description: "Loyer bureau".to_string(),
            flow: FlowType::Depense,
            amount: Money::from_major(200),
            frequency: Frequency::Mensuel,
            due_day,
            account_id: None,
            category_id: None,
            next_due_date,
            is_active: true,
        }
    }

    #[test]
    fn test_create_normalizes_first_due_date() {
        let mut books = Books::new();
        let op = create_recurring(&mut books, new_op(31, date(2024, 4, 10))).unwrap();
        assert_eq!(op.next_due_date, date(2024, 4, 30));
        assert_eq!(op.last_executed_at, None);
    }

    #[test]
    fn test_create_validates() {
        let mut books = Books::new();
        let err = create_recurring(&mut books, new_op(0, date(2024, 4, 1))).unwrap_err();
        assert!(matches!(err, SuiteError::InvalidDueDay { due_day: 0 }));
        let err = create_recurring(&mut books, new_op(32, date(2024, 4, 1))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut free = new_op(5, date(2024, 4, 5));
        free.amount = Money::ZERO;
        assert!(create_recurring(&mut books, free).is_err());

        let ventes = create_category(
            &mut books,
            NewCategory { name: "Ventes".to_string(), flow: FlowType::Revenu },
        )
        .unwrap();
        let mut mismatched = new_op(5, date(2024, 4, 5));
        mismatched.category_id = Some(ventes.id);
        assert!(matches!(
            create_recurring(&mut books, mismatched),
            Err(SuiteError::FlowTypeMismatch { .. })
        ));

        let mut orphan = new_op(5, date(2024, 4, 5));
        orphan.account_id = Some(Uuid::new_v4());
        assert_eq!(create_recurring(&mut books, orphan).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(books.operations.is_empty());
    }

    #[test]
    fn test_due_operations_order_and_filter() {
        let mut books = Books::new();
        let late = create_recurring(&mut books, new_op(5, date(2024, 2, 5))).unwrap();
        let on_time = create_recurring(&mut books, new_op(10, date(2024, 3, 10))).unwrap();
        create_recurring(&mut books, new_op(11, date(2024, 3, 11))).unwrap();
        let paused = create_recurring(&mut books, new_op(1, date(2024, 1, 1))).unwrap();
        set_recurring_active(&mut books, paused.id, false).unwrap();

        let due = due_operations(&books, date(2024, 3, 10));
        let ids: Vec<_> = due.iter().map(|op| op.id).collect();
        assert_eq!(ids, vec![late.id, on_time.id]);
    }

    #[test]
    fn test_delete_recurring() {
        let mut books = Books::new();
        let op = create_recurring(&mut books, new_op(5, date(2024, 2, 5))).unwrap();
        delete_recurring(&mut books, op.id).unwrap();
        assert_eq!(delete_recurring(&mut books, op.id).unwrap_err().kind(), ErrorKind::NotFound);
    }
}
