use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::state::{SavingsAccount, SavingsMovement};
use crate::types::{InterestBasis, MovementType};

/// how interest is determined at liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "mode", content = "value")]
pub enum InterestMode {
    /// account rate applied to the chosen basis, rounded up
    Rate(InterestBasis),
    /// amount agreed by hand, rounded up if fractional
    Fixed(Money),
}

impl InterestMode {
    /// caller-supplied override wins over the rate basis
    pub fn resolve(basis: InterestBasis, fixed_override: Option<Money>) -> Self {
        match fixed_override {
            Some(amount) => InterestMode::Fixed(amount),
            None => InterestMode::Rate(basis),
        }
    }
}

/// figures for closing out a savings account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationResult {
    pub total_deposits: Money,
    pub total_withdrawals: Money,
    pub interest: Money,
    pub total_to_pay: Money,
    pub balance: Money,
}

/// Computes liquidation figures from an account's movements.
///
/// Pure: nothing is written. Marking the account liquidated is a separate
/// ledger operation.
pub struct LiquidationCalculator;

impl LiquidationCalculator {
    pub fn calculate(
        account: &SavingsAccount,
        movements: &[SavingsMovement],
        mode: InterestMode,
    ) -> LiquidationResult {
        Self::calculate_with_rate(account.interest_rate, movements, mode)
    }

    pub fn calculate_with_rate(
        rate: Rate,
        movements: &[SavingsMovement],
        mode: InterestMode,
    ) -> LiquidationResult {
        let mut total_deposits = Money::ZERO;
        let mut total_withdrawals = Money::ZERO;
        for movement in movements.iter().filter(|m| !m.deleted) {
            match movement.movement_type {
                MovementType::Deposit => total_deposits += movement.amount,
                MovementType::Withdrawal => total_withdrawals += movement.amount,
            }
        }

        let balance = total_deposits - total_withdrawals;
        let interest = match mode {
            InterestMode::Fixed(amount) => amount.round_up(),
            InterestMode::Rate(InterestBasis::Balance) => {
                Money::from_decimal_round_up(balance.as_decimal() * rate.as_decimal())
            }
            InterestMode::Rate(InterestBasis::Deposits) => {
                Money::from_decimal_round_up(total_deposits.as_decimal() * rate.as_decimal())
            }
        };

        LiquidationResult {
            total_deposits,
            total_withdrawals,
            interest,
            total_to_pay: balance + interest,
            balance,
        }
    }
}
