pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::state::{Client, Installment, Loan, SavingsAccount, SavingsMovement};
use crate::types::{
    ClientId, InstallmentId, LoanId, LoanStatus, MovementId, SavingsAccountId,
};

pub use memory::MemoryRepository;

/// partial update of an installment; `None` leaves a column untouched and
/// `Some(None)` clears a nullable one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_capital: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_interest: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<Option<Money>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_capital: Option<Option<Money>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_interest: Option<Option<Money>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl InstallmentPatch {
    /// back to unpaid with every paid column cleared
    pub fn reset_payment() -> Self {
        Self {
            paid: Some(false),
            paid_date: Some(None),
            paid_amount: Some(None),
            paid_capital: Some(None),
            paid_interest: Some(None),
            ..Self::default()
        }
    }

    pub fn soft_delete() -> Self {
        Self {
            deleted: Some(true),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, installment: &mut Installment) {
        if let Some(v) = self.amount_capital {
            installment.amount_capital = v;
        }
        if let Some(v) = self.amount_interest {
            installment.amount_interest = v;
        }
        if let Some(v) = self.paid {
            installment.paid = v;
        }
        if let Some(v) = self.paid_date {
            installment.paid_date = v;
        }
        if let Some(v) = self.paid_amount {
            installment.paid_amount = v;
        }
        if let Some(v) = self.paid_capital {
            installment.paid_capital = v;
        }
        if let Some(v) = self.paid_interest {
            installment.paid_interest = v;
        }
        if let Some(v) = self.deleted {
            installment.deleted = v;
        }
    }
}

/// partial update of a loan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LoanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl LoanPatch {
    pub fn closed(on: NaiveDate) -> Self {
        Self {
            status: Some(LoanStatus::Paid),
            closed_at: Some(Some(on)),
            ..Self::default()
        }
    }

    pub fn reopened() -> Self {
        Self {
            status: Some(LoanStatus::Active),
            closed_at: Some(None),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, loan: &mut Loan) {
        if let Some(v) = self.status {
            loan.status = v;
        }
        if let Some(v) = self.closed_at {
            loan.closed_at = v;
        }
        if let Some(v) = self.deleted {
            loan.deleted = v;
        }
    }
}

/// partial update of a savings account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavingsAccountPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidated_at: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl SavingsAccountPatch {
    pub fn apply_to(&self, account: &mut SavingsAccount) {
        if let Some(v) = self.interest_rate {
            account.interest_rate = v;
        }
        if let Some(v) = self.liquidated {
            account.liquidated = v;
        }
        if let Some(v) = self.liquidated_at {
            account.liquidated_at = v;
        }
        if let Some(v) = self.deleted {
            account.deleted = v;
        }
    }
}

/// partial update of a savings movement; only soft delete is supported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavingsMovementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl SavingsMovementPatch {
    pub fn apply_to(&self, movement: &mut SavingsMovement) {
        if let Some(v) = self.deleted {
            movement.deleted = v;
        }
    }
}

/// CRUD and query surface used by the ledger.
///
/// Reads skip soft-deleted rows unless asked otherwise and report a missing
/// row as `Ok(None)`. Writes stamp `updated_at`. Backend failures come back
/// as [`crate::LedgerError::Repository`] and are passed through untouched.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn insert_client(&self, client: Client) -> Result<()>;
    async fn get_client(&self, id: ClientId) -> Result<Option<Client>>;

    async fn insert_loan(&self, loan: Loan) -> Result<()>;
    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>>;
    async fn update_loan(&self, id: LoanId, patch: LoanPatch) -> Result<()>;

    async fn insert_installment(&self, installment: Installment) -> Result<()>;
    async fn get_installment(&self, id: InstallmentId) -> Result<Option<Installment>>;
    /// installments of a loan ordered by number
    async fn get_installments_by_loan(
        &self,
        loan_id: LoanId,
        include_deleted: bool,
    ) -> Result<Vec<Installment>>;
    async fn update_installment(&self, id: InstallmentId, patch: InstallmentPatch) -> Result<()>;

    async fn insert_savings_account(&self, account: SavingsAccount) -> Result<()>;
    async fn get_savings_account(&self, id: SavingsAccountId) -> Result<Option<SavingsAccount>>;
    /// accounts of a client, oldest first
    async fn get_savings_accounts_by_client(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<SavingsAccount>>;
    async fn update_savings_account(
        &self,
        id: SavingsAccountId,
        patch: SavingsAccountPatch,
    ) -> Result<()>;

    async fn insert_savings_movement(&self, movement: SavingsMovement) -> Result<()>;
    async fn get_savings_movement(&self, id: MovementId) -> Result<Option<SavingsMovement>>;
    /// movements of an account ordered by date, then insertion
    async fn get_savings_movements(&self, account_id: SavingsAccountId)
        -> Result<Vec<SavingsMovement>>;
    async fn update_savings_movement(
        &self,
        id: MovementId,
        patch: SavingsMovementPatch,
    ) -> Result<()>;
}
