use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use natillera_ledger::{
    ChargeFrequency, Installment, InterestBasis, InterestType, Ledger, LedgerConfig, LedgerError,
    LedgerRepository, LoanStatus, LoanTerms, MemoryRepository, Money, MovementType,
    PaymentRequest, PaymentTarget, QueuedSync, Rate, RecordingTransport, SafeTimeProvider,
    SyncQueue, SyncTable, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

type TestLedger = Ledger<MemoryRepository, QueuedSync<RecordingTransport>>;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ledger_with(auto_flush: bool) -> (TestLedger, Arc<MemoryRepository>, Arc<QueuedSync<RecordingTransport>>) {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap(),
    ));
    let mut config = LedgerConfig::natillera();
    config.sync.auto_flush = auto_flush;

    let repo = Arc::new(MemoryRepository::new(time.clone()));
    let sync = Arc::new(QueuedSync::new(
        Arc::new(RecordingTransport::new()),
        config.sync.clone(),
        time.clone(),
    ));
    let ledger = Ledger::new(repo.clone(), sync.clone(), time, config).unwrap();
    (ledger, repo, sync)
}

fn fixed_terms(principal: i64, rate: rust_decimal::Decimal) -> LoanTerms {
    LoanTerms {
        client_id: Uuid::new_v4(),
        principal: Money::from_major(principal),
        interest_rate: Rate::from_percentage(rate),
        interest_type: InterestType::Fixed,
        charge_frequency: ChargeFrequency::Monthly,
        start_date: date(2024, 4, 10),
    }
}

fn paid_parts(inst: &Installment) -> Money {
    inst.paid_capital_or_zero() + inst.paid_interest_or_zero()
}

#[tokio::test]
async fn overflow_split_then_interest_closes_the_loan() {
    let (ledger, _, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(1_000, dec!(20))).await.unwrap();
    let first = ledger.installments(loan.id).await.unwrap().remove(0);

    ledger
        .pay_installment(PaymentRequest::new(
            first.id,
            Money::from_major(1_000),
            PaymentTarget::Capital,
        ))
        .await
        .unwrap();

    let installments = ledger.installments(loan.id).await.unwrap();
    assert_eq!(installments.len(), 2);

    let shrunk = &installments[0];
    assert!(shrunk.paid);
    assert_eq!(shrunk.amount_capital, Money::from_major(1_000));
    assert_eq!(shrunk.amount_interest, Money::ZERO);
    assert_eq!(shrunk.paid_capital, Some(Money::from_major(1_000)));

    let second = &installments[1];
    assert_eq!(second.number, 2);
    assert!(!second.paid);
    assert_eq!(second.amount_capital, Money::ZERO);
    assert_eq!(second.amount_interest, Money::from_major(200));
    assert_eq!(second.due_date, date(2024, 5, 10));

    let loan_now = ledger.get_loan(loan.id).await.unwrap().unwrap();
    assert_eq!(loan_now.status, LoanStatus::Active);

    ledger
        .pay_installment(PaymentRequest::new(
            second.id,
            Money::from_major(200),
            PaymentTarget::Both,
        ))
        .await
        .unwrap();

    let closed = ledger.get_loan(loan.id).await.unwrap().unwrap();
    assert_eq!(closed.status, LoanStatus::Paid);
    assert_eq!(closed.closed_at, Some(date(2024, 5, 10)));
}

#[tokio::test]
async fn clamped_payment_on_last_installment_does_not_split() {
    let (ledger, _, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(400, dec!(25))).await.unwrap();
    let inst = ledger.installments(loan.id).await.unwrap().remove(0);
    assert_eq!(inst.scheduled_total(), Money::from_major(500));

    let outcome = ledger
        .pay_installment(PaymentRequest::new(
            inst.id,
            Money::from_major(1_000_000),
            PaymentTarget::Both,
        ))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.allocation.payment, Money::from_major(500));
    assert!(outcome.allocation.fully_paid);
    assert!(outcome.overflow_installment.is_none());
    assert_eq!(ledger.installments(loan.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn settled_installment_ignores_further_payments() {
    let (ledger, _, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(300, dec!(10))).await.unwrap();
    let inst = ledger.installments(loan.id).await.unwrap().remove(0);

    ledger
        .pay_installment(PaymentRequest::new(inst.id, Money::from_major(330), PaymentTarget::Both))
        .await
        .unwrap();
    let settled = ledger.get_installment(inst.id).await.unwrap().unwrap();

    let again = ledger
        .pay_installment(PaymentRequest::new(inst.id, Money::from_major(50), PaymentTarget::Both))
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(ledger.get_installment(inst.id).await.unwrap().unwrap(), settled);
}

#[tokio::test]
async fn payments_never_exceed_the_schedule() {
    let (ledger, _, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(900, dec!(10))).await.unwrap();

    let amounts = [120, 45, 600, 3, 1_000];
    let targets = [
        PaymentTarget::Interest,
        PaymentTarget::Both,
        PaymentTarget::Capital,
        PaymentTarget::Both,
        PaymentTarget::Both,
    ];
    for (amount, target) in amounts.iter().zip(targets) {
        let pending = ledger.pending_installments(loan.id).await.unwrap();
        let Some(next) = pending.first() else { break };
        ledger
            .pay_installment(PaymentRequest::new(next.id, Money::from_major(*amount), target))
            .await
            .unwrap();

        for inst in ledger.installments(loan.id).await.unwrap() {
            assert!(paid_parts(&inst) <= inst.scheduled_total());
            assert!(inst.paid_capital_or_zero() <= inst.amount_capital);
            assert!(inst.paid_interest_or_zero() <= inst.amount_interest);
        }
    }

    // total scheduled never grows past principal plus interest
    let balance = ledger.loan_balance(loan.id).await.unwrap().unwrap();
    assert_eq!(balance.scheduled, Money::from_major(990));
}

#[tokio::test]
async fn undo_keeps_shrunk_amounts_and_reopens() {
    let (ledger, _, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(1_000, dec!(20))).await.unwrap();
    let first = ledger.installments(loan.id).await.unwrap().remove(0);

    ledger
        .pay_installment(PaymentRequest::new(
            first.id,
            Money::from_major(1_000),
            PaymentTarget::Capital,
        ))
        .await
        .unwrap();
    let second = ledger.installments(loan.id).await.unwrap().remove(1);
    ledger
        .pay_installment(PaymentRequest::new(second.id, Money::from_major(200), PaymentTarget::Both))
        .await
        .unwrap();
    assert_eq!(
        ledger.get_loan(loan.id).await.unwrap().unwrap().status,
        LoanStatus::Paid
    );

    ledger.undo_installment_payment(second.id).await.unwrap();

    let loan_now = ledger.get_loan(loan.id).await.unwrap().unwrap();
    assert_eq!(loan_now.status, LoanStatus::Active);
    assert!(loan_now.closed_at.is_none());

    let first_now = ledger.get_installment(first.id).await.unwrap().unwrap();
    assert_eq!(first_now.amount_interest, Money::ZERO);
    assert!(first_now.paid);

    let second_now = ledger.get_installment(second.id).await.unwrap().unwrap();
    assert!(!second_now.paid);
    assert!(second_now.paid_amount.is_none());
    assert_eq!(second_now.amount_interest, Money::from_major(200));
}

#[tokio::test]
async fn undo_reopens_even_when_other_installments_cover_the_loan() {
    let (ledger, _, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(500, dec!(10))).await.unwrap();
    let inst = ledger.installments(loan.id).await.unwrap().remove(0);

    ledger
        .pay_installment(PaymentRequest::new(inst.id, Money::from_major(550), PaymentTarget::Both))
        .await
        .unwrap();
    ledger.undo_installment_payment(inst.id).await.unwrap();

    assert_eq!(
        ledger.get_loan(loan.id).await.unwrap().unwrap().status,
        LoanStatus::Active
    );

    // an explicit reconcile does not close it again, nothing is paid
    assert!(!ledger.reconcile_loan(loan.id).await.unwrap());
}

#[tokio::test]
async fn interest_distribution_pays_oldest_first() {
    let (ledger, repo, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(1_000, dec!(5))).await.unwrap();
    let mut first = ledger.installments(loan.id).await.unwrap().remove(0);
    first.due_date = date(2024, 1, 1);
    repo.insert_installment(first.clone()).await.unwrap();

    let february = Installment::new(
        loan.id,
        2,
        date(2024, 2, 1),
        Money::ZERO,
        Money::from_major(80),
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    );
    repo.insert_installment(february.clone()).await.unwrap();

    let outcome = ledger
        .pay_loan_interest(loan.id, Money::from_major(100), Some(date(2024, 2, 5)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.applied(), Money::from_major(100));

    let jan = ledger.get_installment(first.id).await.unwrap().unwrap();
    assert_eq!(jan.remaining_interest(), Money::ZERO);

    assert_eq!(
        ledger.remaining_interest_for_loan(loan.id).await.unwrap(),
        Money::from_major(30)
    );
}

#[tokio::test]
async fn interest_distribution_can_close_the_loan() {
    let (ledger, _, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(1_000, dec!(10))).await.unwrap();
    let inst = ledger.installments(loan.id).await.unwrap().remove(0);

    ledger
        .pay_installment(PaymentRequest::new(
            inst.id,
            Money::from_major(1_000),
            PaymentTarget::Capital,
        ))
        .await
        .unwrap();

    let outcome = ledger
        .pay_loan_interest(loan.id, Money::from_major(500), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.applied(), Money::from_major(100));
    assert_eq!(outcome.plan.unallocated, Money::from_major(400));
    assert!(outcome.loan_closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_on_one_loan_do_not_double_apply() {
    let (ledger, _, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(1_000, dec!(20))).await.unwrap();
    let inst = ledger.installments(loan.id).await.unwrap().remove(0);

    let pay = || {
        ledger.pay_installment(PaymentRequest::new(
            inst.id,
            Money::from_major(700),
            PaymentTarget::Both,
        ))
    };
    let (a, b) = tokio::join!(pay(), pay());
    let applied: Vec<_> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();

    // the second payment sees the first one's split
    assert_eq!(applied.len(), 1);

    let installments = ledger.installments(loan.id).await.unwrap();
    assert_eq!(installments.len(), 2);
    let paid: Money = installments.iter().map(paid_parts).sum();
    assert_eq!(paid, Money::from_major(700));
    let scheduled: Money = installments.iter().map(|i| i.scheduled_total()).sum();
    assert_eq!(scheduled, Money::from_major(1_200));
}

#[tokio::test]
async fn repository_failures_reach_the_caller() {
    let (ledger, repo, _) = ledger_with(false);
    let loan = ledger.create_loan(fixed_terms(1_000, dec!(20))).await.unwrap();
    let inst = ledger.installments(loan.id).await.unwrap().remove(0);

    repo.set_unavailable(true);
    let err = ledger
        .pay_installment(PaymentRequest::new(inst.id, Money::from_major(10), PaymentTarget::Both))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Repository { .. }));

    assert!(ledger
        .calculate_savings_liquidation(Uuid::new_v4(), InterestBasis::Balance, None)
        .await
        .is_err());

    repo.set_unavailable(false);
    assert!(ledger.get_installment(inst.id).await.unwrap().unwrap().paid_amount.is_none());
}

#[tokio::test]
async fn sync_failures_do_not_fail_ledger_writes() {
    let (ledger, _, sync) = ledger_with(true);
    sync.transport().fail_table(SyncTable::LoanInstallments, true);

    let loan = ledger.create_loan(fixed_terms(1_000, dec!(20))).await.unwrap();
    let inst = ledger.installments(loan.id).await.unwrap().remove(0);
    ledger
        .pay_installment(PaymentRequest::new(inst.id, Money::from_major(100), PaymentTarget::Both))
        .await
        .unwrap();

    // the loan insert went through, installment writes wait for a retry
    let pending = sync.pending().await;
    assert!(!pending.is_empty());
    assert!(pending.iter().all(|op| op.table == SyncTable::LoanInstallments));

    sync.transport().fail_table(SyncTable::LoanInstallments, false);
    let report = sync.flush().await.unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(sync.state().await.pending_operations, 0);
}

#[tokio::test]
async fn liquidation_is_additive_and_order_independent() {
    let (ledger, _, _) = ledger_with(false);
    let account = ledger.get_or_create_savings_account(Uuid::new_v4()).await.unwrap();

    let movements = [
        (MovementType::Withdrawal, 7_500, date(2024, 3, 1)),
        (MovementType::Deposit, 20_000, date(2024, 1, 1)),
        (MovementType::Deposit, 12_345, date(2024, 2, 1)),
    ];
    for (kind, amount, on) in movements {
        ledger
            .add_savings_movement(account.id, kind, Money::from_major(amount), Some(on))
            .await
            .unwrap();
    }

    for basis in [InterestBasis::Balance, InterestBasis::Deposits] {
        let result = ledger
            .calculate_savings_liquidation(account.id, basis, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.balance, result.total_deposits - result.total_withdrawals);
        assert_eq!(result.total_to_pay, result.balance + result.interest);
    }

    let result = ledger
        .calculate_savings_liquidation(account.id, InterestBasis::Balance, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.balance, Money::from_major(24_845));
    // 248.45 rounds up
    assert_eq!(result.interest, Money::from_major(249));
}
