use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::state::Installment;
use crate::types::InstallmentId;

/// interest to apply to one installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestShare {
    pub installment_id: InstallmentId,
    pub amount: Money,
}

/// oldest-first split of a lump interest payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPlan {
    pub shares: Vec<InterestShare>,
    /// part of the payment no installment had interest left for
    pub unallocated: Money,
}

impl DistributionPlan {
    pub fn allocated(&self) -> Money {
        self.shares.iter().map(|s| s.amount).sum()
    }
}

/// spreads an interest-only payment across a loan's installments
pub struct InterestDistributor;

impl InterestDistributor {
    /// walk live installments by due date, then number, paying outstanding interest
    pub fn plan(installments: &[Installment], amount: Money) -> DistributionPlan {
        let mut ordered: Vec<&Installment> = installments.iter().filter(|i| !i.deleted).collect();
        ordered.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.number.cmp(&b.number)));

        let mut pool = amount.clamp_non_negative();
        let mut shares = Vec::new();
        for inst in ordered {
            if !pool.is_positive() {
                break;
            }
            let owed = inst.remaining_interest();
            if !owed.is_positive() {
                continue;
            }
            let share = pool.min(owed);
            shares.push(InterestShare {
                installment_id: inst.id,
                amount: share,
            });
            pool -= share;
        }

        DistributionPlan {
            shares,
            unallocated: pool,
        }
    }
}
