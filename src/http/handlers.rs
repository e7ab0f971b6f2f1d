use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;
use crate::http::extract::{ApiJson, IdempotencyKey, OptionalJson};
use crate::http::AppState;
use crate::invoicing::{Invoice, InvoiceDraft, InvoiceFilter, InvoiceView, OverdueInvoice, ReceivablesSummary};
use crate::ledger::{Account, NewAccount, NewCategory, NewTransaction, Transaction, TransactionCategory};
use crate::parties::{NewThirdParty, ThirdParty};
use crate::payments::{PaymentReceipt, PaymentRequest};
use crate::recurring::{Execution, ExecutionReport, NewRecurringOperation, RecurringOperation};
use crate::suite::SendOutcome;

/// optional body of date-driven endpoints, defaults to today
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AsOfRequest {
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn open_account(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewAccount>,
) -> Result<(StatusCode, Json<Account>)> {
    let account = state.suite.open_account(body)?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn get_account(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Account>> {
    Ok(Json(state.suite.account(id)?))
}

pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewCategory>,
) -> Result<(StatusCode, Json<TransactionCategory>)> {
    let category = state.suite.create_category(body)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn record_transaction(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>)> {
    let transaction = state.suite.record_transaction(body)?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn register_third_party(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewThirdParty>,
) -> Result<(StatusCode, Json<ThirdParty>)> {
    let party = state.suite.register_third_party(body)?;
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<InvoiceDraft>,
) -> Result<(StatusCode, Json<Invoice>)> {
    let clock = state.clock();
    let invoice = state.suite.create_invoice(body, &clock)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(filter): Query<InvoiceFilter>,
) -> Result<Json<Vec<InvoiceView>>> {
    let today = state.today();
    Ok(Json(state.suite.list_invoices(&filter, today)?))
}

pub async fn get_invoice(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<InvoiceView>> {
    let today = state.today();
    Ok(Json(state.suite.invoice_view(id, today)?))
}

pub async fn send_invoice(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SendOutcome>> {
    let clock = state.clock();
    Ok(Json(state.suite.send_invoice(id, &clock)?))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    OptionalJson(body): OptionalJson<CancelRequest>,
) -> Result<Json<Invoice>> {
    let reason = body.and_then(|b| b.reason);
    let clock = state.clock();
    Ok(Json(state.suite.cancel_invoice(id, reason, &clock)?))
}

/// a replayed idempotent request answers 200 instead of 201
pub async fn add_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    IdempotencyKey(key): IdempotencyKey,
    ApiJson(mut body): ApiJson<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentReceipt>)> {
    if key.is_some() {
        body.idempotency_key = key;
    }
    let clock = state.clock();
    let receipt = state.suite.add_payment(id, body, &clock)?;
    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt)))
}

pub async fn create_recurring(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewRecurringOperation>,
) -> Result<(StatusCode, Json<RecurringOperation>)> {
    let op = state.suite.create_recurring(body)?;
    Ok((StatusCode::CREATED, Json(op)))
}

pub async fn execute_operation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    OptionalJson(body): OptionalJson<AsOfRequest>,
) -> Result<Json<Execution>> {
    let clock = state.clock();
    let as_of = body
        .and_then(|b| b.as_of)
        .unwrap_or_else(|| clock.now().date_naive());
    Ok(Json(state.suite.execute_operation(id, as_of, &clock)?))
}

pub async fn execute_due_operations(
    State(state): State<AppState>,
    OptionalJson(body): OptionalJson<AsOfRequest>,
) -> Result<Json<ExecutionReport>> {
    let clock = state.clock();
    let as_of = body
        .and_then(|b| b.as_of)
        .unwrap_or_else(|| clock.now().date_naive());
    Ok(Json(state.suite.execute_due_operations(as_of, &clock)?))
}

pub async fn overdue_report(
    State(state): State<AppState>,
    Query(query): Query<AsOfRequest>,
) -> Result<Json<Vec<OverdueInvoice>>> {
    let as_of = query.as_of.unwrap_or_else(|| state.today());
    Ok(Json(state.suite.sweep_overdue(as_of)?))
}

pub async fn receivables_report(
    State(state): State<AppState>,
    Query(query): Query<AsOfRequest>,
) -> Result<Json<ReceivablesSummary>> {
    let as_of = query.as_of.unwrap_or_else(|| state.today());
    Ok(Json(state.suite.receivables_summary(as_of)?))
}
