/// overflow split - a capital-only payment on the last installment
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use natillera_ledger::{
    format_currency, ChargeFrequency, InterestType, Ledger, LedgerConfig, LoanTerms,
    MemoryRepository, Money, PaymentRequest, PaymentTarget, QueuedSync, Rate, RecordingTransport,
    SafeTimeProvider, SyncQueue, SyncStatus, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== overflow split ===\n");

    let config = LedgerConfig::natillera();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap(),
    ));
    let sync = Arc::new(QueuedSync::new(
        Arc::new(RecordingTransport::new()),
        config.sync.clone(),
        time.clone(),
    ));
    sync.on_status_change(Arc::new(|status: &SyncStatus| {
        if let SyncStatus::Synced { successful, failed } = status {
            println!("  [sync] {} sent, {} pending retry", successful, failed);
        }
    }));
    let ledger = Ledger::new(Arc::new(MemoryRepository::new(time.clone())), sync, time, config)?;

    let loan = ledger
        .create_loan(LoanTerms {
            client_id: Uuid::new_v4(),
            principal: Money::from_major(1_000_000),
            interest_rate: Rate::from_percentage(dec!(20)),
            interest_type: InterestType::Fixed,
            charge_frequency: ChargeFrequency::Monthly,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 31).ok_or("bad date")?,
        })
        .await?;

    let first = ledger.installments(loan.id).await?.remove(0);
    println!("\ninstallment #1 due {}", first.due_date);

    // capital only: the interest rolls into a new installment
    let outcome = ledger
        .pay_installment(PaymentRequest::new(
            first.id,
            Money::from_major(1_000_000),
            PaymentTarget::Capital,
        ))
        .await?
        .ok_or("payment ignored")?;

    if let Some(next) = &outcome.overflow_installment {
        println!(
            "split into #{} due {}: capital {} interest {}",
            next.number,
            next.due_date,
            format_currency(next.amount_capital),
            format_currency(next.amount_interest)
        );

        ledger
            .pay_installment(PaymentRequest::new(
                next.id,
                next.amount_interest,
                PaymentTarget::Interest,
            ))
            .await?;
    }

    for inst in ledger.installments(loan.id).await? {
        println!(
            "#{} due {} scheduled {} paid {}",
            inst.number,
            inst.due_date,
            format_currency(inst.scheduled_total()),
            inst.paid
        );
    }

    let balance = ledger.loan_balance(loan.id).await?.ok_or("loan vanished")?;
    println!("\nremaining {}", format_currency(balance.remaining));
    println!("status {:?}", ledger.get_loan(loan.id).await?.map(|l| l.status));

    Ok(())
}
