/// json state - snapshot the books and restore them
use chrono::{TimeZone, Utc};
use gestion_suite::{
    AccountType, FlowType, InvoiceDraft, InvoiceType, LineInput, Money, NewAccount, NewCategory,
    NewThirdParty, NewTransaction, SafeTimeProvider, Suite, SuiteConfig, ThirdPartyType,
    TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== json state ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap()));
    let config = SuiteConfig::from_json_str(r#"{ "numbering": { "client_prefix": "FA", "sequence_width": 5 } }"#)?;
    let suite = Suite::new(config.clone());

    let account = suite.open_account(NewAccount {
        name: "Caisse".to_string(),
        account_type: AccountType::Especes,
        currency: None,
        opening_balance: Money::from_major(80_000),
    })?;
    let fournitures = suite.create_category(NewCategory {
        name: "Fournitures".to_string(),
        flow: FlowType::Depense,
    })?;
    suite.record_transaction(NewTransaction {
        account_id: account.id,
        transaction_category_id: Some(fournitures.id),
        flow: FlowType::Depense,
        amount: Money::from_major(12_500),
        description: Some("Papier et encre".to_string()),
        transaction_date: time.now().date_naive(),
    })?;

    let client = suite.register_third_party(NewThirdParty {
        name: "Epicerie Tsaralalana".to_string(),
        party_type: ThirdPartyType::Client,
        details: None,
        email: None,
    })?;
    suite.create_invoice(
        InvoiceDraft {
            invoice_type: InvoiceType::Client,
            third_party_id: client.id,
            invoice_number: None,
            issue_date: time.now().date_naive(),
            due_date: time.now().date_naive(),
            payment_terms: None,
            lines: vec![LineInput {
                designation: "Conseil".to_string(),
                quantity: dec!(2.5),
                unit_price: Money::from_major(40_000),
                tax_rate: None,
                discount: None,
            }],
        },
        &time,
    )?;

    let raw = suite.to_json()?;
    println!("{}\n", raw);

    let restored = Suite::from_json(config, &raw)?;
    println!("restored balance: {}", restored.account(account.id)?.balance);

    Ok(())
}
