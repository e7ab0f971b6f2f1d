//! Cash accounts, transaction categories and the transactions that move
//! account balances. Single-entry: a revenu credits its account, a depense
//! debits it, and nothing else touches a balance once the account is open.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::books::Books;
use crate::decimal::Money;
use crate::errors::{Result, SuiteError};
use crate::events::Event;
use crate::types::{
    AccountId, AccountType, CategoryId, FlowType, InvoiceId, OperationId, PaymentId,
    TransactionId,
};

/// cash account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub balance: Money,
    pub currency: String,
}

impl Account {
    /// apply a movement and return the new balance
    pub fn apply(&mut self, flow: FlowType, amount: Money) -> Result<Money> {
        let balance = match flow {
            FlowType::Revenu => self.balance.checked_add(amount),
            FlowType::Depense => self.balance.checked_sub(amount),
        };
        self.balance = balance.ok_or(SuiteError::AmountOverflow {
            context: "account balance",
        })?;
        Ok(self.balance)
    }

    /// undo a movement previously applied with [`Account::apply`]
    pub fn reverse(&mut self, flow: FlowType, amount: Money) -> Result<Money> {
        let balance = match flow {
            FlowType::Revenu => self.balance.checked_sub(amount),
            FlowType::Depense => self.balance.checked_add(amount),
        };
        self.balance = balance.ok_or(SuiteError::AmountOverflow {
            context: "account balance",
        })?;
        Ok(self.balance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCategory {
    pub id: CategoryId,
    pub name: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
}

/// what produced a transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionOrigin {
    Manual,
    InvoicePayment {
        invoice_id: InvoiceId,
        payment_id: PaymentId,
    },
    RecurringOperation {
        operation_id: OperationId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub transaction_category_id: Option<CategoryId>,
    #[serde(rename = "type")]
    pub flow: FlowType,
    /// always positive, the direction is carried by `flow`
    pub amount: Money,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub origin: TransactionOrigin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// falls back to the configured default currency
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub opening_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: AccountId,
    #[serde(default)]
    pub transaction_category_id: Option<CategoryId>,
    #[serde(rename = "type")]
    pub flow: FlowType,
    pub amount: Money,
    #[serde(default)]
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
}

pub fn open_account(books: &mut Books, new: NewAccount, default_currency: &str) -> Result<Account> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(SuiteError::MissingField { field: "name" });
    }
    let currency = new
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(default_currency)
        .to_uppercase();

    let account = Account {
        id: Uuid::new_v4(),
        name: name.to_string(),
        account_type: new.account_type,
        balance: new.opening_balance,
        currency,
    };
    books.accounts.insert(account.id, account.clone());
    Ok(account)
}

pub fn create_category(books: &mut Books, new: NewCategory) -> Result<TransactionCategory> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(SuiteError::MissingField { field: "name" });
    }
    let category = TransactionCategory {
        id: Uuid::new_v4(),
        name: name.to_string(),
        flow: new.flow,
    };
    books.categories.insert(category.id, category.clone());
    Ok(category)
}

/// the category, when given, must exist and classify the same direction
pub(crate) fn check_category(
    books: &Books,
    category_id: Option<CategoryId>,
    flow: FlowType,
) -> Result<()> {
    if let Some(id) = category_id {
        let category = books.category(id)?;
        if category.flow != flow {
            return Err(SuiteError::FlowTypeMismatch {
                field: "transaction_category_id",
                expected: category.flow,
                actual: flow,
            });
        }
    }
    Ok(())
}

/// create a transaction and apply it to its account
pub(crate) fn post(
    books: &mut Books,
    new: NewTransaction,
    origin: TransactionOrigin,
) -> Result<Transaction> {
    if !new.amount.is_positive() {
        return Err(SuiteError::InvalidAmount {
            field: "amount".to_string(),
            value: new.amount.to_string(),
        });
    }
    check_category(books, new.transaction_category_id, new.flow)?;

    let transaction = Transaction {
        id: Uuid::new_v4(),
        account_id: new.account_id,
        transaction_category_id: new.transaction_category_id,
        flow: new.flow,
        amount: new.amount,
        description: new.description.filter(|d| !d.trim().is_empty()),
        transaction_date: new.transaction_date,
        origin,
    };

    let new_balance = books
        .account_mut(new.account_id)?
        .apply(transaction.flow, transaction.amount)?;
    books.transactions.insert(transaction.id, transaction.clone());

    debug!(
        transaction_id = %transaction.id,
        account_id = %transaction.account_id,
        flow = transaction.flow.as_str(),
        amount = %transaction.amount,
        %new_balance,
        "transaction posted"
    );
    books.emit(Event::TransactionRecorded {
        transaction_id: transaction.id,
        account_id: transaction.account_id,
        flow: transaction.flow,
        amount: transaction.amount,
        new_balance,
        transaction_date: transaction.transaction_date,
    });

    Ok(transaction)
}

/// manual entry
pub fn record_transaction(books: &mut Books, new: NewTransaction) -> Result<Transaction> {
    post(books, new, TransactionOrigin::Manual)
}

/// remove a transaction and reverse its effect on the account balance
pub fn delete_transaction(books: &mut Books, id: TransactionId) -> Result<()> {
    let transaction = books.transaction(id)?.clone();
    let settles_payment = books
        .invoices
        .values()
        .flat_map(|inv| inv.payments.iter())
        .any(|p| p.transaction_id == Some(id));
    if settles_payment {
        return Err(SuiteError::StillReferenced {
            entity: "transaction",
            id,
            referenced_by: "invoice payment",
        });
    }

    let new_balance = books
        .account_mut(transaction.account_id)?
        .reverse(transaction.flow, transaction.amount)?;
    books.transactions.remove(&id);
    books.emit(Event::TransactionReversed {
        transaction_id: id,
        account_id: transaction.account_id,
        amount: transaction.amount,
        new_balance,
    });
    Ok(())
}

/// rejected while transactions reference the account, recurring operations
/// merely lose their link
pub fn delete_account(books: &mut Books, id: AccountId) -> Result<()> {
    books.account(id)?;
    if books.transactions.values().any(|t| t.account_id == id) {
        return Err(SuiteError::StillReferenced {
            entity: "account",
            id,
            referenced_by: "transaction",
        });
    }
    for op in books.operations.values_mut() {
        if op.account_id == Some(id) {
            op.account_id = None;
        }
    }
    books.accounts.remove(&id);
    Ok(())
}

/// categories are optional everywhere, so references are cleared
pub fn delete_category(books: &mut Books, id: CategoryId) -> Result<()> {
    books.category(id)?;
    for transaction in books.transactions.values_mut() {
        if transaction.transaction_category_id == Some(id) {
            transaction.transaction_category_id = None;
        }
    }
    for op in books.operations.values_mut() {
        if op.category_id == Some(id) {
            op.category_id = None;
        }
    }
    books.categories.remove(&id);
    Ok(())
}
