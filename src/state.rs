use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::types::{
    ChargeFrequency, ClientId, InstallmentId, InterestType, LoanId, LoanStatus, MovementId,
    MovementType, OwnerId, SavingsAccountId,
};

/// borrower or saver, owned by one loan officer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub owner_id: OwnerId,
    pub name: String,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

impl Client {
    pub fn new(
        owner_id: OwnerId,
        name: String,
        document_id: Option<String>,
        phone: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            document_id,
            phone,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }
}

/// loan record; `status` is only ever written by reconciliation and payment undo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub client_id: ClientId,
    pub principal: Money,
    pub interest_rate: Rate,
    pub interest_type: InterestType,
    pub charge_frequency: ChargeFrequency,
    pub start_date: NaiveDate,
    pub status: LoanStatus,
    pub closed_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }
}

/// one scheduled capital + interest obligation of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    /// 1-based, never reused
    pub number: u32,
    pub due_date: NaiveDate,
    /// scheduled capital; shrinks when the installment is split
    pub amount_capital: Money,
    /// scheduled interest; shrinks when the installment is split
    pub amount_interest: Money,
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
    pub paid_amount: Option<Money>,
    pub paid_capital: Option<Money>,
    pub paid_interest: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

impl Installment {
    /// new unpaid installment
    pub fn new(
        loan_id: LoanId,
        number: u32,
        due_date: NaiveDate,
        amount_capital: Money,
        amount_interest: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            number,
            due_date,
            amount_capital,
            amount_interest,
            paid: false,
            paid_date: None,
            paid_amount: None,
            paid_capital: None,
            paid_interest: None,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }

    pub fn scheduled_total(&self) -> Money {
        self.amount_capital + self.amount_interest
    }

    pub fn paid_capital_or_zero(&self) -> Money {
        self.paid_capital.unwrap_or(Money::ZERO)
    }

    pub fn paid_interest_or_zero(&self) -> Money {
        self.paid_interest.unwrap_or(Money::ZERO)
    }

    pub fn paid_amount_or_zero(&self) -> Money {
        self.paid_amount.unwrap_or(Money::ZERO)
    }

    pub fn remaining_capital(&self) -> Money {
        self.amount_capital.saturating_sub(self.paid_capital_or_zero())
    }

    pub fn remaining_interest(&self) -> Money {
        self.amount_interest.saturating_sub(self.paid_interest_or_zero())
    }

    pub fn remaining_total(&self) -> Money {
        self.remaining_capital() + self.remaining_interest()
    }

    /// amount this installment contributes to the loan's paid total
    pub fn counted_paid(&self) -> Money {
        match self.paid_amount {
            Some(amount) => amount,
            None if self.paid => self.scheduled_total(),
            None => Money::ZERO,
        }
    }
}

/// savings account of a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsAccount {
    pub id: SavingsAccountId,
    pub client_id: ClientId,
    pub name: String,
    pub interest_rate: Rate,
    pub liquidated: bool,
    pub liquidated_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

impl SavingsAccount {
    pub fn new(client_id: ClientId, name: String, interest_rate: Rate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            name,
            interest_rate,
            liquidated: false,
            liquidated_at: None,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }
}

/// deposit or withdrawal; append-only apart from soft delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsMovement {
    pub id: MovementId,
    pub account_id: SavingsAccountId,
    pub movement_type: MovementType,
    pub amount: Money,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

impl SavingsMovement {
    pub fn new(
        account_id: SavingsAccountId,
        movement_type: MovementType,
        amount: Money,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            movement_type,
            amount,
            date,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }
}
