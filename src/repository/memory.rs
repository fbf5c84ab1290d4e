use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use tokio::sync::RwLock;

use crate::errors::{LedgerError, Result};
use crate::state::{Client, Installment, Loan, SavingsAccount, SavingsMovement};
use crate::types::{ClientId, InstallmentId, LoanId, MovementId, SavingsAccountId};

use super::{
    InstallmentPatch, LedgerRepository, LoanPatch, SavingsAccountPatch, SavingsMovementPatch,
};

#[derive(Default)]
struct Tables {
    clients: HashMap<ClientId, Client>,
    loans: HashMap<LoanId, Loan>,
    installments: HashMap<InstallmentId, Installment>,
    accounts: HashMap<SavingsAccountId, SavingsAccount>,
    movements: HashMap<MovementId, SavingsMovement>,
    /// insertion order of movements, used to break date ties
    movement_seq: HashMap<MovementId, u64>,
    next_seq: u64,
}

/// In-process repository.
///
/// Rows live in hash maps behind one async lock. Flip [`set_unavailable`]
/// to make every call fail the way an unreachable backend would.
///
/// [`set_unavailable`]: MemoryRepository::set_unavailable
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    time: SafeTimeProvider,
}

impl MemoryRepository {
    /// `updated_at` is stamped from `time`; share the ledger's provider.
    pub fn new(time: SafeTimeProvider) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            unavailable: AtomicBool::new(false),
            time,
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::repository("storage unavailable"));
        }
        Ok(())
    }

    fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }
}

#[async_trait]
impl LedgerRepository for MemoryRepository {
    async fn insert_client(&self, client: Client) -> Result<()> {
        self.check_available()?;
        self.tables.write().await.clients.insert(client.id, client);
        Ok(())
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.clients.get(&id).filter(|c| !c.deleted).cloned())
    }

    async fn insert_loan(&self, loan: Loan) -> Result<()> {
        self.check_available()?;
        self.tables.write().await.loans.insert(loan.id, loan);
        Ok(())
    }

    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.loans.get(&id).filter(|l| !l.deleted).cloned())
    }

    async fn update_loan(&self, id: LoanId, patch: LoanPatch) -> Result<()> {
        self.check_available()?;
        let now = self.now();
        let mut tables = self.tables.write().await;
        if let Some(loan) = tables.loans.get_mut(&id) {
            patch.apply_to(loan);
            loan.updated_at = now;
        }
        Ok(())
    }

    async fn insert_installment(&self, installment: Installment) -> Result<()> {
        self.check_available()?;
        self.tables
            .write()
            .await
            .installments
            .insert(installment.id, installment);
        Ok(())
    }

    async fn get_installment(&self, id: InstallmentId) -> Result<Option<Installment>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.installments.get(&id).filter(|i| !i.deleted).cloned())
    }

    async fn get_installments_by_loan(
        &self,
        loan_id: LoanId,
        include_deleted: bool,
    ) -> Result<Vec<Installment>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Installment> = tables
            .installments
            .values()
            .filter(|i| i.loan_id == loan_id && (include_deleted || !i.deleted))
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.number);
        Ok(rows)
    }

    async fn update_installment(&self, id: InstallmentId, patch: InstallmentPatch) -> Result<()> {
        self.check_available()?;
        let now = self.now();
        let mut tables = self.tables.write().await;
        if let Some(installment) = tables.installments.get_mut(&id) {
            patch.apply_to(installment);
            installment.updated_at = now;
        }
        Ok(())
    }

    async fn insert_savings_account(&self, account: SavingsAccount) -> Result<()> {
        self.check_available()?;
        self.tables.write().await.accounts.insert(account.id, account);
        Ok(())
    }

    async fn get_savings_account(&self, id: SavingsAccountId) -> Result<Option<SavingsAccount>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.accounts.get(&id).filter(|a| !a.deleted).cloned())
    }

    async fn get_savings_accounts_by_client(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<SavingsAccount>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<SavingsAccount> = tables
            .accounts
            .values()
            .filter(|a| a.client_id == client_id && !a.deleted)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.created_at);
        Ok(rows)
    }

    async fn update_savings_account(
        &self,
        id: SavingsAccountId,
        patch: SavingsAccountPatch,
    ) -> Result<()> {
        self.check_available()?;
        let now = self.now();
        let mut tables = self.tables.write().await;
        if let Some(account) = tables.accounts.get_mut(&id) {
            patch.apply_to(account);
            account.updated_at = now;
        }
        Ok(())
    }

    async fn insert_savings_movement(&self, movement: SavingsMovement) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.movement_seq.insert(movement.id, seq);
        tables.movements.insert(movement.id, movement);
        Ok(())
    }

    async fn get_savings_movement(&self, id: MovementId) -> Result<Option<SavingsMovement>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.movements.get(&id).filter(|m| !m.deleted).cloned())
    }

    async fn get_savings_movements(
        &self,
        account_id: SavingsAccountId,
    ) -> Result<Vec<SavingsMovement>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<(u64, SavingsMovement)> = tables
            .movements
            .values()
            .filter(|m| m.account_id == account_id && !m.deleted)
            .map(|m| {
                let seq = tables.movement_seq.get(&m.id).copied().unwrap_or(u64::MAX);
                (seq, m.clone())
            })
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| a.date.cmp(&b.date).then(sa.cmp(sb)));
        Ok(rows.into_iter().map(|(_, m)| m).collect())
    }

    async fn update_savings_movement(
        &self,
        id: MovementId,
        patch: SavingsMovementPatch,
    ) -> Result<()> {
        self.check_available()?;
        let now = self.now();
        let mut tables = self.tables.write().await;
        if let Some(movement) = tables.movements.get_mut(&id) {
            patch.apply_to(movement);
            movement.updated_at = now;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::types::MovementType;
    use chrono::{Duration, NaiveDate, TimeZone};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(fixed_clock()))
    }

    fn installment(loan_id: LoanId, number: u32) -> Installment {
        Installment::new(
            loan_id,
            number,
            NaiveDate::from_ymd_opt(2024, number, 1).unwrap(),
            Money::from_major(100),
            Money::from_major(10),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_installments_are_ordered_and_filtered() {
        let repo = MemoryRepository::new(test_time());
        let loan_id = Uuid::new_v4();

        for number in [3, 1, 2] {
            repo.insert_installment(installment(loan_id, number)).await.unwrap();
        }
        repo.insert_installment(installment(Uuid::new_v4(), 1)).await.unwrap();

        let rows = repo.get_installments_by_loan(loan_id, false).await.unwrap();
        let numbers: Vec<u32> = rows.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        repo.update_installment(rows[1].id, InstallmentPatch::soft_delete())
            .await
            .unwrap();
        assert_eq!(repo.get_installments_by_loan(loan_id, false).await.unwrap().len(), 2);
        assert_eq!(repo.get_installments_by_loan(loan_id, true).await.unwrap().len(), 3);
        assert!(repo.get_installment(rows[1].id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_updates_stamp_updated_at() {
        let repo = MemoryRepository::new(test_time());
        let inst = installment(Uuid::new_v4(), 1);
        let id = inst.id;
        repo.insert_installment(inst).await.unwrap();

        let patch = InstallmentPatch {
            paid: Some(true),
            ..InstallmentPatch::default()
        };
        repo.update_installment(id, patch).await.unwrap();

        let stored = repo.get_installment(id).await.unwrap().unwrap();
        assert!(stored.paid);
        assert_eq!(stored.updated_at, fixed_clock());
    }

    #[tokio::test]
    async fn test_updated_at_follows_shared_time() {
        let time = test_time();
        let control = time.test_control().unwrap();
        let repo = MemoryRepository::new(time.clone());
        let inst = installment(Uuid::new_v4(), 1);
        let id = inst.id;
        repo.insert_installment(inst).await.unwrap();

        control.advance(Duration::days(3));
        repo.update_installment(id, InstallmentPatch::reset_payment())
            .await
            .unwrap();

        let stored = repo.get_installment(id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, fixed_clock() + Duration::days(3));
        assert_eq!(stored.updated_at, time.now());
    }

    #[tokio::test]
    async fn test_movements_ordered_by_date_then_insertion() {
        let repo = MemoryRepository::new(test_time());
        let now = fixed_clock();
        let account = SavingsAccount::new(Uuid::new_v4(), "Ahorro".into(), Rate::ZERO, now);
        let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();

        let late = SavingsMovement::new(account.id, MovementType::Deposit, Money::ONE, day(9), now);
        let first = SavingsMovement::new(account.id, MovementType::Deposit, Money::ONE, day(3), now);
        let second =
            SavingsMovement::new(account.id, MovementType::Withdrawal, Money::ONE, day(3), now);
        for m in [late.clone(), first.clone(), second.clone()] {
            repo.insert_savings_movement(m).await.unwrap();
        }

        let ids: Vec<MovementId> = repo
            .get_savings_movements(account.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id, late.id]);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let repo = MemoryRepository::new(test_time());
        repo.set_unavailable(true);

        let err = repo.get_loan(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Repository { .. }));

        repo.set_unavailable(false);
        assert!(repo.get_loan(Uuid::new_v4()).await.unwrap().is_none());
    }
}
