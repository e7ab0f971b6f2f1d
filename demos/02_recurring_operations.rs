/// recurring operations - monthly rent and quarterly insurance over half a year
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use gestion_suite::{
    AccountType, FlowType, Frequency, Money, NewAccount, NewRecurringOperation, SafeTimeProvider,
    Suite, SuiteConfig, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== recurring operations ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();
    let suite = Suite::new(SuiteConfig::madagascar());

    let account = suite.open_account(NewAccount {
        name: "BOA exploitation".to_string(),
        account_type: AccountType::Bancaire,
        currency: None,
        opening_balance: Money::from_major(10_000_000),
    })?;

    suite.create_recurring(NewRecurringOperation {
        description: "Loyer bureau".to_string(),
        flow: FlowType::Depense,
        amount: Money::from_major(1_200_000),
        frequency: Frequency::Mensuel,
        due_day: 31,
        account_id: Some(account.id),
        category_id: None,
        next_due_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap_or_default(),
        is_active: true,
    })?;
    suite.create_recurring(NewRecurringOperation {
        description: "Assurance".to_string(),
        flow: FlowType::Depense,
        amount: Money::from_major(450_000),
        frequency: Frequency::Trimestriel,
        due_day: 15,
        account_id: Some(account.id),
        category_id: None,
        next_due_date: NaiveDate::from_ymd_opt(2024, 2, 15).unwrap_or_default(),
        is_active: true,
    })?;

    // one batch run per day, like a cron trigger
    for _ in 0..182 {
        let today = time.now().date_naive();
        let report = suite.execute_due_operations(today, &time)?;
        for execution in &report.executions {
            println!(
                "{}: {} on {} -> next {}",
                today,
                execution.transaction.description.as_deref().unwrap_or("-"),
                execution.occurrence_date,
                execution.next_due_date
            );
        }
        controller.advance(Duration::days(1));
    }

    println!("\nbalance: {}", suite.account(account.id)?.balance);
    Ok(())
}
