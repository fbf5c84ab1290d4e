pub mod allocation;
pub mod amortization;
pub mod distribution;
pub mod reconciliation;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::state::Installment;
use crate::types::{InstallmentId, LoanId, PaymentTarget};

pub use allocation::{Allocation, OverflowRemainder, PaymentAllocator};
pub use amortization::{
    add_period, build_loan, AmortizationCalculator, AmortizationSchedule, LoanTerms,
    ScheduledInstallment,
};
pub use distribution::{DistributionPlan, InterestDistributor, InterestShare};
pub use reconciliation::{LoanBalance, LoanReconciler, Settlement};

/// payment against a single installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub installment_id: InstallmentId,
    pub amount: Money,
    /// defaults to today
    pub paid_date: Option<NaiveDate>,
    pub target: PaymentTarget,
}

impl PaymentRequest {
    pub fn new(installment_id: InstallmentId, amount: Money, target: PaymentTarget) -> Self {
        Self {
            installment_id,
            amount,
            paid_date: None,
            target,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.paid_date = Some(date);
        self
    }
}

/// what a payment did to its loan
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub loan_id: LoanId,
    pub allocation: Allocation,
    /// installment appended when the last one was split
    pub overflow_installment: Option<Installment>,
    /// the payment settled the loan
    pub loan_closed: bool,
}

/// result of an interest-only payment across a loan
#[derive(Debug, Clone, PartialEq)]
pub struct InterestPaymentOutcome {
    pub loan_id: LoanId,
    pub plan: DistributionPlan,
    pub allocations: Vec<Allocation>,
    pub loan_closed: bool,
}

impl InterestPaymentOutcome {
    pub fn applied(&self) -> Money {
        self.allocations.iter().map(|a| a.payment).sum()
    }
}
