pub mod liquidation;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::state::{SavingsAccount, SavingsMovement};

pub use liquidation::{InterestMode, LiquidationCalculator, LiquidationResult};

/// account overview as shown to a loan officer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsSummary {
    pub account: SavingsAccount,
    pub movements: Vec<SavingsMovement>,
    pub liquidation: LiquidationResult,
    pub first_movement: Option<NaiveDate>,
    pub last_movement: Option<NaiveDate>,
}

impl SavingsSummary {
    pub fn new(
        account: SavingsAccount,
        movements: Vec<SavingsMovement>,
        liquidation: LiquidationResult,
    ) -> Self {
        let dates = movements.iter().filter(|m| !m.deleted).map(|m| m.date);
        let first_movement = dates.clone().min();
        let last_movement = dates.max();

        Self {
            account,
            movements,
            liquidation,
            first_movement,
            last_movement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::types::{InterestBasis, MovementType};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_summary_dates() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let account = SavingsAccount::new(Uuid::nil(), "Ahorro principal".into(), Rate::ZERO, now);
        let day = |d| NaiveDate::from_ymd_opt(2024, 4, d).unwrap();
        let movements = vec![
            SavingsMovement::new(account.id, MovementType::Deposit, Money::from_major(10), day(9), now),
            SavingsMovement::new(account.id, MovementType::Deposit, Money::from_major(10), day(2), now),
            SavingsMovement::new(account.id, MovementType::Withdrawal, Money::from_major(5), day(20), now),
        ];
        let liquidation = LiquidationCalculator::calculate(
            &account,
            &movements,
            InterestMode::Rate(InterestBasis::Balance),
        );

        let summary = SavingsSummary::new(account, movements, liquidation);
        assert_eq!(summary.first_movement, Some(day(2)));
        assert_eq!(summary.last_movement, Some(day(20)));
        assert_eq!(summary.liquidation.balance, Money::from_major(15));
    }

    #[test]
    fn test_summary_without_movements() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let account = SavingsAccount::new(Uuid::nil(), "Ahorro".into(), Rate::ZERO, now);
        let liquidation = LiquidationCalculator::calculate(
            &account,
            &[],
            InterestMode::Rate(InterestBasis::Balance),
        );

        let summary = SavingsSummary::new(account, Vec::new(), liquidation);
        assert!(summary.first_movement.is_none());
        assert!(summary.last_movement.is_none());
        assert_eq!(summary.liquidation.total_to_pay, Money::ZERO);
    }
}
