use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::state::Installment;
use crate::types::InstallmentId;

/// scheduled vs. paid totals of a loan's live installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanBalance {
    pub scheduled: Money,
    pub paid: Money,
    pub remaining: Money,
}

impl LoanBalance {
    pub fn from_installments<'a, I>(installments: I) -> Self
    where
        I: IntoIterator<Item = &'a Installment>,
    {
        let mut scheduled = Money::ZERO;
        let mut paid = Money::ZERO;
        for inst in installments.into_iter().filter(|i| !i.deleted) {
            scheduled += inst.scheduled_total();
            paid += inst.counted_paid();
        }

        Self {
            scheduled,
            paid,
            remaining: scheduled.saturating_sub(paid),
        }
    }
}

/// what closing a settled loan has to write
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub balance: LoanBalance,
    /// live installments still flagged unpaid
    pub mark_paid: Vec<InstallmentId>,
}

/// decides whether a loan's installments cover its schedule
#[derive(Debug, Clone, Copy)]
pub struct LoanReconciler {
    tolerance: Money,
}

impl LoanReconciler {
    pub fn new(tolerance: Money) -> Self {
        Self { tolerance }
    }

    pub fn is_settled(&self, balance: &LoanBalance) -> bool {
        balance.paid + self.tolerance >= balance.scheduled
    }

    /// `None` while anything is still owed, or when the loan has no live installments
    pub fn assess(&self, installments: &[Installment]) -> Option<Settlement> {
        if !installments.iter().any(|i| !i.deleted) {
            return None;
        }

        let balance = LoanBalance::from_installments(installments);
        if !self.is_settled(&balance) {
            return None;
        }

        let mark_paid = installments
            .iter()
            .filter(|i| !i.deleted && !i.paid)
            .map(|i| i.id)
            .collect();

        Some(Settlement { balance, mark_paid })
    }
}

impl Default for LoanReconciler {
    fn default() -> Self {
        Self::new(Money::CENT)
    }
}
