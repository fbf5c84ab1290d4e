use chrono::NaiveDate;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::repository::{LedgerRepository, SavingsAccountPatch, SavingsMovementPatch};
use crate::savings::{InterestMode, LiquidationCalculator, LiquidationResult, SavingsSummary};
use crate::state::{SavingsAccount, SavingsMovement};
use crate::sync::{SyncOperation, SyncQueue, SyncTable};
use crate::types::{ClientId, InterestBasis, MovementId, MovementType, SavingsAccountId};

use super::Ledger;

impl<R: LedgerRepository, Q: SyncQueue> Ledger<R, Q> {
    /// The client's oldest account, or a new one with the configured defaults.
    pub async fn get_or_create_savings_account(&self, client_id: ClientId) -> Result<SavingsAccount> {
        let existing = self.repo.get_savings_accounts_by_client(client_id).await?;
        if let Some(account) = existing.into_iter().next() {
            return Ok(account);
        }

        let now = self.now();
        let account = SavingsAccount::new(
            client_id,
            self.config.savings.default_account_name.clone(),
            self.config.savings.default_interest_rate,
            now,
        );
        self.repo.insert_savings_account(account.clone()).await?;
        self.publish(SyncOperation::insert(SyncTable::SavingsAccounts, &account, now))
            .await;

        tracing::info!(account_id = %account.id, client_id = %client_id, "savings account opened");
        Ok(account)
    }

    pub async fn get_savings_account(
        &self,
        account_id: SavingsAccountId,
    ) -> Result<Option<SavingsAccount>> {
        self.repo.get_savings_account(account_id).await
    }

    pub async fn savings_movements(&self, account_id: SavingsAccountId) -> Result<Vec<SavingsMovement>> {
        self.repo.get_savings_movements(account_id).await
    }

    pub async fn update_savings_interest_rate(
        &self,
        account_id: SavingsAccountId,
        rate: Rate,
    ) -> Result<()> {
        if rate.is_negative() {
            return Err(LedgerError::InvalidInterestRate { rate });
        }
        if self.repo.get_savings_account(account_id).await?.is_none() {
            return Ok(());
        }

        let patch = SavingsAccountPatch {
            interest_rate: Some(rate),
            ..SavingsAccountPatch::default()
        };
        self.repo.update_savings_account(account_id, patch.clone()).await?;
        self.publish(SyncOperation::update(
            SyncTable::SavingsAccounts,
            account_id,
            &patch,
            self.now(),
        ))
        .await;
        Ok(())
    }

    /// Record a deposit or withdrawal; `None` when the account does not exist.
    pub async fn add_savings_movement(
        &self,
        account_id: SavingsAccountId,
        movement_type: MovementType,
        amount: Money,
        date: Option<NaiveDate>,
    ) -> Result<Option<SavingsMovement>> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }
        if self.repo.get_savings_account(account_id).await?.is_none() {
            return Ok(None);
        }

        let now = self.now();
        let date = date.unwrap_or_else(|| self.today());
        let movement = SavingsMovement::new(account_id, movement_type, amount, date, now);
        self.repo.insert_savings_movement(movement.clone()).await?;
        self.publish(SyncOperation::insert(SyncTable::SavingsMovements, &movement, now))
            .await;

        tracing::debug!(
            account_id = %account_id,
            movement_id = %movement.id,
            kind = ?movement_type,
            amount = %amount,
            "savings movement recorded"
        );
        Ok(Some(movement))
    }

    pub async fn delete_savings_movement(&self, movement_id: MovementId) -> Result<()> {
        if self.repo.get_savings_movement(movement_id).await?.is_none() {
            return Ok(());
        }

        let patch = SavingsMovementPatch {
            deleted: Some(true),
        };
        self.repo.update_savings_movement(movement_id, patch).await?;
        self.publish(Ok(SyncOperation::soft_delete(
            SyncTable::SavingsMovements,
            movement_id,
            self.now(),
        )))
        .await;
        Ok(())
    }

    /// soft delete an account and its movements
    pub async fn delete_savings_account(&self, account_id: SavingsAccountId) -> Result<()> {
        if self.repo.get_savings_account(account_id).await?.is_none() {
            return Ok(());
        }
        let now = self.now();

        for movement in self.repo.get_savings_movements(account_id).await? {
            self.repo
                .update_savings_movement(
                    movement.id,
                    SavingsMovementPatch {
                        deleted: Some(true),
                    },
                )
                .await?;
            self.publish(Ok(SyncOperation::soft_delete(
                SyncTable::SavingsMovements,
                movement.id,
                now,
            )))
            .await;
        }

        let patch = SavingsAccountPatch {
            deleted: Some(true),
            ..SavingsAccountPatch::default()
        };
        self.repo.update_savings_account(account_id, patch).await?;
        self.publish(Ok(SyncOperation::soft_delete(SyncTable::SavingsAccounts, account_id, now)))
            .await;

        tracing::info!(account_id = %account_id, "savings account deleted");
        Ok(())
    }

    /// Liquidation figures for an account; nothing is written.
    ///
    /// A `fixed_override` replaces the rate-based interest.
    pub async fn calculate_savings_liquidation(
        &self,
        account_id: SavingsAccountId,
        basis: InterestBasis,
        fixed_override: Option<Money>,
    ) -> Result<Option<LiquidationResult>> {
        let Some(account) = self.repo.get_savings_account(account_id).await? else {
            return Ok(None);
        };
        let movements = self.repo.get_savings_movements(account_id).await?;

        Ok(Some(LiquidationCalculator::calculate(
            &account,
            &movements,
            InterestMode::resolve(basis, fixed_override),
        )))
    }

    /// Flag an account liquidated as of today.
    pub async fn mark_savings_liquidated(&self, account_id: SavingsAccountId) -> Result<()> {
        if self.repo.get_savings_account(account_id).await?.is_none() {
            return Ok(());
        }

        let today = self.today();
        let patch = SavingsAccountPatch {
            liquidated: Some(true),
            liquidated_at: Some(Some(today)),
            ..SavingsAccountPatch::default()
        };
        self.repo.update_savings_account(account_id, patch.clone()).await?;
        self.publish(SyncOperation::update(
            SyncTable::SavingsAccounts,
            account_id,
            &patch,
            self.now(),
        ))
        .await;

        tracing::info!(account_id = %account_id, liquidated_at = %today, "savings account liquidated");
        Ok(())
    }

    pub async fn savings_summary(
        &self,
        account_id: SavingsAccountId,
        basis: InterestBasis,
    ) -> Result<Option<SavingsSummary>> {
        let Some(account) = self.repo.get_savings_account(account_id).await? else {
            return Ok(None);
        };
        let movements = self.repo.get_savings_movements(account_id).await?;
        let liquidation =
            LiquidationCalculator::calculate(&account, &movements, InterestMode::Rate(basis));

        Ok(Some(SavingsSummary::new(account, movements, liquidation)))
    }
}
