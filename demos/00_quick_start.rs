/// quick start - invoice a client and record the payment
use gestion_suite::{
    AccountType, InvoiceDraft, InvoiceType, LineInput, Money, NewAccount, NewThirdParty,
    PaymentRequest, SafeTimeProvider, Suite, SuiteConfig, ThirdPartyType, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let today = time.now().date_naive();
    let suite = Suite::new(SuiteConfig::madagascar());

    let account = suite.open_account(NewAccount {
        name: "BNI courant".to_string(),
        account_type: AccountType::Bancaire,
        currency: None,
        opening_balance: Money::from_major(250_000),
    })?;
    let client = suite.register_third_party(NewThirdParty {
        name: "Société Rova".to_string(),
        party_type: ThirdPartyType::Client,
        details: None,
        email: Some("compta@rova.mg".to_string()),
    })?;

    // one line, 20% tax
    let invoice = suite.create_invoice(
        InvoiceDraft {
            invoice_type: InvoiceType::Client,
            third_party_id: client.id,
            invoice_number: None,
            issue_date: today,
            due_date: today + chrono::Duration::days(30),
            payment_terms: Some("30 jours".to_string()),
            lines: vec![LineInput {
                designation: "Développement site web".to_string(),
                quantity: dec!(1),
                unit_price: Money::from_major(1_500_000),
                tax_rate: Some(dec!(20).into()),
                discount: None,
            }],
        },
        &time,
    )?;
    suite.send_invoice(invoice.id, &time)?;

    let receipt = suite.add_payment(
        invoice.id,
        PaymentRequest {
            account_id: account.id,
            amount: invoice.total_amount,
            payment_date: today,
            payment_method: Some("virement".to_string()),
            transaction_category_id: None,
            description: None,
            idempotency_key: None,
        },
        &time,
    )?;

    println!("{}", serde_json::to_string_pretty(&receipt)?);
    println!("balance: {} {}", suite.account(account.id)?.balance, account.currency);

    Ok(())
}
