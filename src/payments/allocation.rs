use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::repository::InstallmentPatch;
use crate::state::Installment;
use crate::types::{InstallmentId, PaymentTarget};

/// installment component a payment can land on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaymentComponent {
    Interest,
    Capital,
}

impl PaymentTarget {
    /// components in the order a payment is poured into them
    fn components(&self) -> &'static [PaymentComponent] {
        match self {
            PaymentTarget::Capital => &[PaymentComponent::Capital],
            PaymentTarget::Interest => &[PaymentComponent::Interest],
            PaymentTarget::Both => &[PaymentComponent::Interest, PaymentComponent::Capital],
        }
    }
}

/// leftover carried by a freshly appended installment after a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowRemainder {
    pub capital: Money,
    pub interest: Money,
}

impl OverflowRemainder {
    pub fn total(&self) -> Money {
        self.capital + self.interest
    }
}

/// outcome of applying one payment to one installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub installment_id: InstallmentId,
    /// requested amount after clamping to what the installment still owes
    pub payment: Money,
    pub to_capital: Money,
    pub to_interest: Money,
    /// cumulative paid columns after this payment
    pub paid_capital: Money,
    pub paid_interest: Money,
    pub paid_amount: Money,
    pub fully_paid: bool,
    /// scheduled columns to store; lower than before only when split
    pub amount_capital: Money,
    pub amount_interest: Money,
    pub overflow: Option<OverflowRemainder>,
}

impl Allocation {
    pub fn is_split(&self) -> bool {
        self.overflow.is_some()
    }

    /// row update that records this allocation
    pub fn to_patch(&self, paid_date: NaiveDate) -> InstallmentPatch {
        InstallmentPatch {
            amount_capital: Some(self.amount_capital),
            amount_interest: Some(self.amount_interest),
            paid: Some(self.fully_paid),
            paid_date: Some(Some(paid_date)),
            paid_amount: Some(Some(self.paid_amount)),
            paid_capital: Some(Some(self.paid_capital)),
            paid_interest: Some(Some(self.paid_interest)),
            deleted: None,
        }
    }

    /// unpaid installment carrying the leftover of a split `source`
    pub fn overflow_installment(
        &self,
        source: &Installment,
        number: u32,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Option<Installment> {
        self.overflow.map(|rest| {
            Installment::new(
                source.loan_id,
                number,
                due_date,
                rest.capital,
                rest.interest,
                now,
            )
        })
    }
}

/// splits payments between the capital and interest of an installment
#[derive(Debug, Clone, Copy)]
pub struct PaymentAllocator {
    tolerance: Money,
}

impl PaymentAllocator {
    pub fn new(tolerance: Money) -> Self {
        Self { tolerance }
    }

    /// Apply `amount` to `installment`.
    ///
    /// Returns `None` when there is nothing to do: a non-positive amount or an
    /// installment that owes nothing. `is_last` marks the highest-numbered live
    /// installment of the loan; a payment that leaves it short splits the
    /// remainder into a new installment instead of leaving it open.
    pub fn allocate(
        &self,
        installment: &Installment,
        amount: Money,
        target: PaymentTarget,
        is_last: bool,
    ) -> Option<Allocation> {
        if !amount.is_positive() {
            return None;
        }

        let remaining_capital = installment.remaining_capital();
        let remaining_interest = installment.remaining_interest();
        let remaining_total = remaining_capital + remaining_interest;
        if !remaining_total.is_positive() {
            return None;
        }

        let payment = amount.min(remaining_total);

        let mut available = payment;
        let mut to_capital = Money::ZERO;
        let mut to_interest = Money::ZERO;
        for component in target.components() {
            let applied = match component {
                PaymentComponent::Interest => {
                    to_interest = available.min(remaining_interest);
                    to_interest
                }
                PaymentComponent::Capital => {
                    to_capital = available.min(remaining_capital);
                    to_capital
                }
            };
            available -= applied;
        }

        let paid_capital = installment.paid_capital_or_zero() + to_capital;
        let paid_interest = installment.paid_interest_or_zero() + to_interest;
        let paid_amount = installment.paid_amount_or_zero() + payment;

        let capital_after = installment.amount_capital.saturating_sub(paid_capital);
        let interest_after = installment.amount_interest.saturating_sub(paid_interest);
        let remaining_after = capital_after + interest_after;

        let mut allocation = Allocation {
            installment_id: installment.id,
            payment,
            to_capital,
            to_interest,
            paid_capital,
            paid_interest,
            paid_amount,
            fully_paid: false,
            amount_capital: installment.amount_capital,
            amount_interest: installment.amount_interest,
            overflow: None,
        };

        if is_last && remaining_after.is_positive() {
            allocation.fully_paid = true;
            allocation.amount_capital = paid_capital;
            allocation.amount_interest = paid_interest;
            allocation.overflow = Some(OverflowRemainder {
                capital: capital_after,
                interest: interest_after,
            });
            return Some(allocation);
        }

        allocation.fully_paid = match target {
            // a target-specific payment marks the installment attended
            PaymentTarget::Capital | PaymentTarget::Interest => payment.is_positive(),
            PaymentTarget::Both => {
                paid_capital >= installment.amount_capital - self.tolerance
                    && paid_interest >= installment.amount_interest - self.tolerance
            }
        };

        Some(allocation)
    }
}

impl Default for PaymentAllocator {
    fn default() -> Self {
        Self::new(Money::CENT)
    }
}
