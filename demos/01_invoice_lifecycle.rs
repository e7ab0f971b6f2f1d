/// invoice lifecycle - draft, send, partial payment, overdue, settlement
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use gestion_suite::invoicing::OutboxNotifier;
use gestion_suite::{
    AccountType, InvoiceDraft, InvoiceType, InvoiceUpdate, LineInput, Money, NewAccount,
    NewThirdParty, PaymentRequest, SafeTimeProvider, Suite, SuiteConfig, ThirdPartyType,
    TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== invoice lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();
    let outbox = Arc::new(OutboxNotifier::new());
    let suite = Suite::new(SuiteConfig::madagascar()).with_notifier(outbox.clone());

    let account = suite.open_account(NewAccount {
        name: "Mvola".to_string(),
        account_type: AccountType::MobileMoney,
        currency: None,
        opening_balance: Money::ZERO,
    })?;
    let client = suite.register_third_party(NewThirdParty {
        name: "Hôtel Colbert".to_string(),
        party_type: ThirdPartyType::Client,
        details: Some("29 rue Printsy Ratsimamanga, Antananarivo".to_string()),
        email: Some("direction@colbert.mg".to_string()),
    })?;

    let lines = vec![
        LineInput {
            designation: "Maintenance climatisation".to_string(),
            quantity: dec!(4),
            unit_price: Money::from_major(180_000),
            tax_rate: Some(dec!(20).into()),
            discount: Some(dec!(10).into()),
        },
        LineInput {
            designation: "Déplacement".to_string(),
            quantity: dec!(1),
            unit_price: Money::from_major(50_000),
            tax_rate: None,
            discount: None,
        },
    ];

    // stage 1: draft
    let draft = suite.create_invoice(
        InvoiceDraft {
            invoice_type: InvoiceType::Client,
            third_party_id: client.id,
            invoice_number: None,
            issue_date: time.now().date_naive(),
            due_date: time.now().date_naive() + Duration::days(15),
            payment_terms: Some("15 jours".to_string()),
            lines: lines.clone(),
        },
        &time,
    )?;
    println!("draft {:?}: total {}", draft.invoice_number, draft.total_amount);

    // stage 2: fix the quantity while still a draft
    let mut corrected = lines;
    corrected[0].quantity = dec!(3);
    let draft = suite.update_draft(
        draft.id,
        InvoiceUpdate {
            third_party_id: client.id,
            issue_date: draft.issue_date,
            due_date: draft.due_date,
            payment_terms: draft.payment_terms.clone(),
            lines: corrected,
        },
        &time,
    )?;
    println!("corrected total {}", draft.total_amount);

    // stage 3: send
    let outcome = suite.send_invoice(draft.id, &time)?;
    println!("sent: {:?}", outcome.delivery);
    println!("{}", outbox.sent()[0].body);

    // stage 4: partial payment
    let receipt = suite.add_payment(
        draft.id,
        PaymentRequest {
            account_id: account.id,
            amount: Money::from_major(300_000),
            payment_date: time.now().date_naive(),
            payment_method: Some("mvola".to_string()),
            transaction_category_id: None,
            description: None,
            idempotency_key: Some("colbert-acompte".to_string()),
        },
        &time,
    )?;
    println!("paid {} remaining {} ({})", receipt.amount_paid, receipt.remaining, receipt.invoice_status);

    // stage 5: a month later the rest is late
    controller.advance(Duration::days(30));
    let today = time.now().date_naive();
    let view = suite.invoice_view(draft.id, today)?;
    println!("on {}: {:?}", today, view.display_status);
    for overdue in suite.sweep_overdue(today)? {
        println!("  overdue {:?}: {} days, {} left", overdue.invoice_number, overdue.days_overdue, overdue.remaining);
    }

    // stage 6: settle
    let receipt = suite.add_payment(
        draft.id,
        PaymentRequest {
            account_id: account.id,
            amount: view.remaining,
            payment_date: today,
            payment_method: Some("mvola".to_string()),
            transaction_category_id: None,
            description: None,
            idempotency_key: Some("colbert-solde".to_string()),
        },
        &time,
    )?;
    println!("settled: {}", receipt.invoice_status);

    // cancelling a paid invoice is refused
    if let Err(e) = suite.cancel_invoice(draft.id, None, &time) {
        println!("cancel refused: {}", e);
    }

    println!("\nevents:");
    for event in suite.take_events()? {
        println!("  {}", serde_json::to_string(&event)?);
    }

    Ok(())
}
