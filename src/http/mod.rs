//! JSON api over a [`Suite`].

pub mod error;
pub mod extract;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};

use crate::suite::Suite;

pub use error::ErrorResponse;

#[derive(Clone)]
pub struct AppState {
    pub suite: Suite,
    /// frozen clock for reproducible runs, system time otherwise
    pinned_time: Option<DateTime<Utc>>,
}

impl AppState {
    pub fn new(suite: Suite) -> Self {
        Self {
            suite,
            pinned_time: None,
        }
    }

    pub fn pinned(suite: Suite, at: DateTime<Utc>) -> Self {
        Self {
            suite,
            pinned_time: Some(at),
        }
    }

    /// a clock for the current request
    pub fn clock(&self) -> SafeTimeProvider {
        match self.pinned_time {
            Some(at) => SafeTimeProvider::new(TimeSource::Test(at)),
            None => SafeTimeProvider::new(TimeSource::System),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock().now().date_naive()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/accounts", post(handlers::open_account))
        .route("/accounts/:id", get(handlers::get_account))
        .route("/categories", post(handlers::create_category))
        .route("/transactions", post(handlers::record_transaction))
        .route("/third-parties", post(handlers::register_third_party))
        .route(
            "/invoices",
            post(handlers::create_invoice).get(handlers::list_invoices),
        )
        .route("/invoices/:id", get(handlers::get_invoice))
        .route("/invoices/:id/send", post(handlers::send_invoice))
        .route("/invoices/:id/cancel", post(handlers::cancel_invoice))
        .route("/invoices/:id/payments", post(handlers::add_payment))
        .route("/recurring-operations", post(handlers::create_recurring))
        .route(
            "/recurring-operations/:id/execute",
            post(handlers::execute_operation),
        )
        .route(
            "/execute-due-operations",
            post(handlers::execute_due_operations),
        )
        .route("/reports/overdue", get(handlers::overdue_report))
        .route("/reports/receivables", get(handlers::receivables_report))
        .with_state(state)
}
