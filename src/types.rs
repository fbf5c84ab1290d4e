use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// user (loan officer) that owns clients
pub type OwnerId = Uuid;
pub type ClientId = Uuid;
pub type LoanId = Uuid;
pub type InstallmentId = Uuid;
pub type SavingsAccountId = Uuid;
pub type MovementId = Uuid;

/// how the interest of a loan is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestType {
    /// flat percentage of the principal, independent of term
    Fixed,
    /// amortizing annuity on the remaining balance
    Compound,
    /// annualized percentage prorated over the term
    Simple,
}

/// how often a loan charges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ChargeFrequency {
    pub fn periods_per_year(&self) -> u32 {
        match self {
            ChargeFrequency::Daily => 365,
            ChargeFrequency::Weekly => 52,
            ChargeFrequency::Monthly => 12,
        }
    }
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// something is still owed
    Active,
    /// scheduled total fully covered
    Paid,
}

/// which component of an installment a payment goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentTarget {
    Capital,
    Interest,
    /// interest first, then capital
    Both,
}

/// savings movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Deposit,
    Withdrawal,
}

/// base on which savings interest is charged at liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestBasis {
    /// rate applied to deposits minus withdrawals
    Balance,
    /// rate applied to total deposits, ignoring withdrawals
    Deposits,
}
