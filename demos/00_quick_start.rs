/// quick start - lend, collect and close a loan
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use natillera_ledger::{
    format_currency, ChargeFrequency, InterestType, Ledger, LedgerConfig, LoanTerms,
    MemoryRepository, Money, PaymentRequest, PaymentTarget, QueuedSync, Rate, RecordingTransport,
    SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = LedgerConfig::natillera();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
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

    let client = ledger
        .register_client(Uuid::new_v4(), "Marta Gómez", None, Some("3001234567".into()))
        .await?;

    // 500.000 at 10% flat
    let loan = ledger
        .create_loan(LoanTerms {
            client_id: client.id,
            principal: Money::from_major(500_000),
            interest_rate: Rate::from_percentage(dec!(10)),
            interest_type: InterestType::Fixed,
            charge_frequency: ChargeFrequency::Monthly,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).ok_or("bad date")?,
        })
        .await?;

    let installment = ledger.installments(loan.id).await?.remove(0);
    println!(
        "loan for {}: capital {} + interest {}",
        client.name,
        format_currency(installment.amount_capital),
        format_currency(installment.amount_interest)
    );

    // pay everything at once
    let outcome = ledger
        .pay_installment(PaymentRequest::new(
            installment.id,
            Money::from_major(550_000),
            PaymentTarget::Both,
        ))
        .await?;

    if let Some(outcome) = outcome {
        println!("applied {}", format_currency(outcome.allocation.payment));
        println!("loan closed: {}", outcome.loan_closed);
    }

    let loan = ledger.get_loan(loan.id).await?.ok_or("loan vanished")?;
    println!("status {:?}, closed at {:?}", loan.status, loan.closed_at);

    Ok(())
}
