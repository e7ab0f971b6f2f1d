//! Materializes due recurring operations into transactions.
//!
//! Each operation runs in its own atomic unit and re-checks that it is still
//! active and due once the books are locked. Two overlapping batch runs
//! therefore never credit the same occurrence twice; the loser sees the
//! advanced due date and skips it.

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::books::{Books, SharedBooks};
use crate::errors::{ErrorKind, Result, SuiteError};
use crate::events::Event;
use crate::ledger::{self, NewTransaction, Transaction, TransactionOrigin};
use crate::recurring::{due_operations, schedule};
use crate::types::OperationId;

/// one materialized occurrence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Execution {
    pub operation_id: OperationId,
    pub transaction: Transaction,
    pub occurrence_date: NaiveDate,
    pub next_due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationError {
    pub operation_id: OperationId,
    pub kind: ErrorKind,
    pub message: String,
}

/// outcome of a batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub as_of: NaiveDate,
    pub executed_count: usize,
    pub total_due: usize,
    pub executions: Vec<Execution>,
    pub errors: Vec<OperationError>,
}

/// execute one occurrence of an operation that is active and due
///
/// The transaction is dated on the occurrence, not on `as_of`.
pub fn execute_operation(
    books: &mut Books,
    id: OperationId,
    as_of: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Execution> {
    let op = books.operation(id)?.clone();
    if !op.is_active {
        return Err(SuiteError::OperationInactive { id });
    }
    if op.next_due_date > as_of {
        return Err(SuiteError::OperationNotDue {
            id,
            next_due_date: op.next_due_date,
        });
    }
    let account_id = op
        .account_id
        .ok_or(SuiteError::MissingField { field: "account_id" })?;
    let occurrence_date = op.next_due_date;
    let next_due_date = schedule::advance(occurrence_date, op.frequency, op.due_day)?;

    let transaction = ledger::post(
        books,
        NewTransaction {
            account_id,
            transaction_category_id: op.category_id,
            flow: op.flow,
            amount: op.amount,
            description: Some(op.description.clone()),
            transaction_date: occurrence_date,
        },
        TransactionOrigin::RecurringOperation { operation_id: id },
    )?;

    let stored = books.operation_mut(id)?;
    stored.next_due_date = next_due_date;
    stored.last_executed_at = Some(now);

    books.emit(Event::RecurringOperationExecuted {
        operation_id: id,
        transaction_id: transaction.id,
        occurrence_date,
        next_due_date,
        timestamp: now,
    });

    Ok(Execution {
        operation_id: id,
        transaction,
        occurrence_date,
        next_due_date,
    })
}

/// batch entry point: execute every operation due on `as_of`
///
/// Failures are collected per operation and never stop the batch.
///
/// Each operation is executed at most once per run. An operation several
/// periods behind moves forward by one period per run, so `next_due_date`
/// always lies after the last executed occurrence and every occurrence gets
/// its own transaction and event. Catching up takes repeated runs on the
/// same `as_of` until `executed_count` drops to zero.
pub fn execute_due_operations(
    books: &SharedBooks,
    as_of: NaiveDate,
    time_provider: &SafeTimeProvider,
) -> Result<ExecutionReport> {
    let due: Vec<OperationId> =
        books.read(|b| due_operations(b, as_of).into_iter().map(|op| op.id).collect())?;

    let mut report = ExecutionReport {
        as_of,
        executed_count: 0,
        total_due: due.len(),
        executions: Vec::new(),
        errors: Vec::new(),
    };

    for id in due {
        let now = time_provider.now();
        match books.atomically(|b| execute_operation(b, id, as_of, now)) {
            Ok(execution) => {
                info!(
                    operation_id = %id,
                    occurrence = %execution.occurrence_date,
                    next_due = %execution.next_due_date,
                    amount = %execution.transaction.amount,
                    "recurring operation executed"
                );
                report.executed_count += 1;
                report.executions.push(execution);
            }
            Err(SuiteError::OperationNotDue { .. }) | Err(SuiteError::OperationInactive { .. }) => {
                debug!(operation_id = %id, "recurring operation no longer due, skipped");
            }
            Err(err) => {
                warn!(operation_id = %id, error = %err, "recurring operation failed");
                let reason = err.to_string();
                report.errors.push(OperationError {
                    operation_id: id,
                    kind: err.kind(),
                    message: reason.clone(),
                });
                let recorded = books.atomically(|b| {
                    b.emit(Event::RecurringOperationFailed {
                        operation_id: id,
                        reason,
                        timestamp: now,
                    });
                    Ok(())
                });
                if let Err(e) = recorded {
                    warn!(operation_id = %id, error = %e, "could not record failure event");
                }
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::ledger::{open_account, NewAccount};
    use crate::recurring::{create_recurring, NewRecurringOperation};
    use crate::types::{AccountId, AccountType, FlowType, Frequency};
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap()))
    }

    fn account(books: &mut Books, balance: i64) -> AccountId {
        open_account(
            books,
            NewAccount {
                name: "BOA".to_string(),
                account_type: AccountType::Bancaire,
                currency: None,
                opening_balance: Money::from_major(balance),
            },
            "MGA",
        )
        .unwrap()
        .id
    }

    fn operation(account_id: Option<AccountId>, due_day: u32, next: NaiveDate) -> NewRecurringOperation {
        NewRecurringOperation {
            description: "Abonnement internet".to_string(),
            flow: FlowType::Depense,
            amount: Money::from_major(200),
            frequency: Frequency::Mensuel,
            due_day,
            account_id,
            category_id: None,
            next_due_date: next,
            is_active: true,
        }
    }

    #[test]
    fn test_single_execution() {
        let mut books = Books::new();
        let acc = account(&mut books, 1000);
        let op = create_recurring(&mut books, operation(Some(acc), 5, date(2024, 3, 5))).unwrap();
        let now = clock().now();

        let execution = execute_operation(&mut books, op.id, date(2024, 3, 10), now).unwrap();

        assert_eq!(execution.transaction.transaction_date, date(2024, 3, 5));
        assert_eq!(execution.next_due_date, date(2024, 4, 5));
        assert_eq!(books.account(acc).unwrap().balance, Money::from_major(800));
        assert_eq!(books.operation(op.id).unwrap().last_executed_at, Some(now));

        let err = execute_operation(&mut books, op.id, date(2024, 3, 10), now).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_inactive_operation_is_refused() {
        let mut books = Books::new();
        let acc = account(&mut books, 1000);
        let mut new = operation(Some(acc), 5, date(2024, 3, 5));
        new.is_active = false;
        let op = create_recurring(&mut books, new).unwrap();

        let err = execute_operation(&mut books, op.id, date(2024, 3, 10), clock().now()).unwrap_err();
        assert!(matches!(err, SuiteError::OperationInactive { .. }));
    }

    #[test]
    fn test_failures_are_collected_and_do_not_stop_the_batch() {
        let mut books = Books::new();
        let acc = account(&mut books, 1000);
        let orphan = create_recurring(&mut books, operation(None, 1, date(2024, 3, 1))).unwrap();
        let ok = create_recurring(&mut books, operation(Some(acc), 5, date(2024, 3, 5))).unwrap();
        let shared = SharedBooks::new(books);

        let report = execute_due_operations(&shared, date(2024, 3, 10), &clock()).unwrap();

        assert_eq!(report.total_due, 2);
        assert_eq!(report.executed_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].operation_id, orphan.id);
        assert_eq!(report.executions[0].operation_id, ok.id);

        let events = shared.take_events().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::RecurringOperationFailed { operation_id, .. } if *operation_id == orphan.id)));
        // the failed operation was not advanced
        let next = shared.read(|b| b.operations[&orphan.id].next_due_date).unwrap();
        assert_eq!(next, date(2024, 3, 1));
    }

    #[test]
    fn test_second_run_executes_nothing() {
        let mut books = Books::new();
        let acc = account(&mut books, 1000);
        create_recurring(&mut books, operation(Some(acc), 5, date(2024, 3, 5))).unwrap();
        let shared = SharedBooks::new(books);
        let time = clock();

        let first = execute_due_operations(&shared, date(2024, 3, 10), &time).unwrap();
        let second = execute_due_operations(&shared, date(2024, 3, 10), &time).unwrap();

        assert_eq!(first.executed_count, 1);
        assert_eq!(second.executed_count, 0);
        assert_eq!(second.total_due, 0);
        let balance = shared.read(|b| b.accounts[&acc].balance).unwrap();
        assert_eq!(balance, Money::from_major(800));
    }

    #[test]
    fn test_backlog_is_caught_up_one_period_per_run() {
        let mut books = Books::new();
        let acc = account(&mut books, 1000);
        let op = create_recurring(&mut books, operation(Some(acc), 5, date(2024, 1, 5))).unwrap();
        let shared = SharedBooks::new(books);
        let time = clock();

        let mut occurrences = Vec::new();
        loop {
            let report = execute_due_operations(&shared, date(2024, 3, 10), &time).unwrap();
            if report.executed_count == 0 {
                break;
            }
            assert_eq!(report.executed_count, 1);
            occurrences.push(report.executions[0].occurrence_date);
        }

        assert_eq!(occurrences, vec![date(2024, 1, 5), date(2024, 2, 5), date(2024, 3, 5)]);
        let next = shared.read(|b| b.operations[&op.id].next_due_date).unwrap();
        assert_eq!(next, date(2024, 4, 5));
        let balance = shared.read(|b| b.accounts[&acc].balance).unwrap();
        assert_eq!(balance, Money::from_major(400));
    }

    #[test]
    fn test_unknown_operation() {
        let mut books = Books::new();
        let err = execute_operation(&mut books, Uuid::new_v4(), date(2024, 3, 10), clock().now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
