/// savings liquidation - both interest bases and a fixed override
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use natillera_ledger::{
    format_currency, InterestBasis, Ledger, LedgerConfig, MemoryRepository, Money, MovementType,
    QueuedSync, Rate, RecordingTransport, SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = LedgerConfig::natillera();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 12, 15, 9, 0, 0).unwrap(),
    ));
    // repository, sync queue and ledger read the same clock
    let sync = QueuedSync::new(
        Arc::new(RecordingTransport::new()),
        config.sync.clone(),
        time.clone(),
    );
    let ledger = Ledger::new(
        Arc::new(MemoryRepository::new(time.clone())),
        Arc::new(sync),
        time,
        config,
    )?;

    let account = ledger.get_or_create_savings_account(Uuid::new_v4()).await?;
    ledger
        .update_savings_interest_rate(account.id, Rate::from_percentage(dec!(1.5)))
        .await?;

    for month in 1..=11 {
        let date = NaiveDate::from_ymd_opt(2024, month, 5).ok_or("bad date")?;
        ledger
            .add_savings_movement(account.id, MovementType::Deposit, Money::from_major(50_000), Some(date))
            .await?;
    }
    let withdrawal = NaiveDate::from_ymd_opt(2024, 8, 20).ok_or("bad date")?;
    ledger
        .add_savings_movement(account.id, MovementType::Withdrawal, Money::from_major(120_000), Some(withdrawal))
        .await?;

    for (label, basis, fixed) in [
        ("balance", InterestBasis::Balance, None),
        ("deposits", InterestBasis::Deposits, None),
        ("fixed", InterestBasis::Balance, Some(Money::from_major(10_000))),
    ] {
        if let Some(result) = ledger
            .calculate_savings_liquidation(account.id, basis, fixed)
            .await?
        {
            println!(
                "{:<9} balance {} interest {} to pay {}",
                label,
                format_currency(result.balance),
                format_currency(result.interest),
                format_currency(result.total_to_pay)
            );
        }
    }

    ledger.mark_savings_liquidated(account.id).await?;
    if let Some(summary) = ledger.savings_summary(account.id, InterestBasis::Balance).await? {
        println!(
            "\n{} liquidated {:?}, movements {} from {:?} to {:?}",
            summary.account.name,
            summary.account.liquidated_at,
            summary.movements.len(),
            summary.first_movement,
            summary.last_movement
        );
    }

    Ok(())
}
