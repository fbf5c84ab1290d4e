use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::state::{Installment, Loan};
use crate::types::{ChargeFrequency, ClientId, InterestType, LoanId, LoanStatus};

/// terms a loan is created with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub client_id: ClientId,
    pub principal: Money,
    pub interest_rate: Rate,
    pub interest_type: InterestType,
    pub charge_frequency: ChargeFrequency,
    pub start_date: NaiveDate,
}

impl LoanTerms {
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LedgerError::InvalidPrincipal {
                amount: self.principal,
            });
        }
        if self.interest_rate.is_negative() {
            return Err(LedgerError::InvalidInterestRate {
                rate: self.interest_rate,
            });
        }
        Ok(())
    }
}

/// build a loan with its single aggregate installment.
///
/// The whole principal plus `principal * rate` of interest is due on the start
/// date regardless of interest type or frequency; multi-period tables come
/// from [`AmortizationSchedule`].
pub fn build_loan(terms: &LoanTerms, now: DateTime<Utc>) -> Result<(Loan, Vec<Installment>)> {
    terms.validate()?;

    let loan = Loan {
        id: Uuid::new_v4(),
        client_id: terms.client_id,
        principal: terms.principal,
        interest_rate: terms.interest_rate,
        interest_type: terms.interest_type,
        charge_frequency: terms.charge_frequency,
        start_date: terms.start_date,
        status: LoanStatus::Active,
        closed_at: None,
        created_at: now,
        updated_at: now,
        deleted: false,
    };

    let total_interest = Money::from_decimal_round_up(
        terms.principal.as_decimal() * terms.interest_rate.as_decimal(),
    );
    let installment = Installment::new(
        loan.id,
        1,
        terms.start_date,
        terms.principal,
        total_interest,
        now,
    );

    Ok((loan, vec![installment]))
}

/// one row of a generated schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub number: u32,
    pub due_date: NaiveDate,
    pub amount_capital: Money,
    pub amount_interest: Money,
}

impl ScheduledInstallment {
    pub fn total(&self) -> Money {
        self.amount_capital + self.amount_interest
    }
}

/// multi-period installment table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub interest_rate: Rate,
    pub interest_type: InterestType,
    pub charge_frequency: ChargeFrequency,
    pub periods: u32,
    pub start_date: NaiveDate,
    pub installments: Vec<ScheduledInstallment>,
    pub total_capital: Money,
    pub total_interest: Money,
}

impl AmortizationSchedule {
    /// generate a table of `periods` installments; zero periods is treated as one
    pub fn generate(
        principal: Money,
        interest_rate: Rate,
        interest_type: InterestType,
        charge_frequency: ChargeFrequency,
        periods: u32,
        start_date: NaiveDate,
    ) -> Result<Self> {
        let periods = periods.max(1);
        let calculator = AmortizationCalculator::new(interest_type, charge_frequency);
        let installments =
            calculator.calculate_schedule(principal, interest_rate, periods, start_date)?;

        let total_capital = installments.iter().map(|i| i.amount_capital).sum();
        let total_interest = installments.iter().map(|i| i.amount_interest).sum();

        Ok(Self {
            principal,
            interest_rate,
            interest_type,
            charge_frequency,
            periods,
            start_date,
            installments,
            total_capital,
            total_interest,
        })
    }

    pub fn total_payment(&self) -> Money {
        self.total_capital + self.total_interest
    }

    /// materialize the table as unpaid installment records of a loan
    pub fn to_installments(&self, loan_id: LoanId, now: DateTime<Utc>) -> Vec<Installment> {
        self.installments
            .iter()
            .map(|s| {
                Installment::new(
                    loan_id,
                    s.number,
                    s.due_date,
                    s.amount_capital,
                    s.amount_interest,
                    now,
                )
            })
            .collect()
    }
}

/// schedule calculator for one interest type and frequency
pub struct AmortizationCalculator {
    interest_type: InterestType,
    frequency: ChargeFrequency,
}

impl AmortizationCalculator {
    pub fn new(interest_type: InterestType, frequency: ChargeFrequency) -> Self {
        Self {
            interest_type,
            frequency,
        }
    }

    pub fn calculate_schedule(
        &self,
        principal: Money,
        annual_rate: Rate,
        periods: u32,
        start_date: NaiveDate,
    ) -> Result<Vec<ScheduledInstallment>> {
        let period_rate = annual_rate.period_rate(self.frequency).as_decimal();

        if self.interest_type == InterestType::Compound && period_rate > Decimal::ZERO {
            self.calculate_annuity(principal, period_rate, periods, start_date)
        } else {
            self.calculate_linear(principal, annual_rate, periods, start_date)
        }
    }

    /// equal payments; interest on the remaining balance
    fn calculate_annuity(
        &self,
        principal: Money,
        period_rate: Decimal,
        periods: u32,
        start_date: NaiveDate,
    ) -> Result<Vec<ScheduledInstallment>> {
        let payment = annuity_payment(principal.as_decimal(), period_rate, periods)?;

        let mut remaining = principal.as_decimal();
        let mut schedule = Vec::with_capacity(periods as usize);

        for i in 1..=periods {
            let interest = remaining * period_rate;
            let capital = payment - interest;
            remaining -= capital;

            schedule.push(ScheduledInstallment {
                number: i,
                due_date: add_period(start_date, i, self.frequency)?,
                amount_capital: Money::from_decimal_round_up(capital),
                amount_interest: Money::from_decimal_round_up(interest),
            });
        }

        Ok(schedule)
    }

    /// capital and interest spread evenly across periods
    fn calculate_linear(
        &self,
        principal: Money,
        annual_rate: Rate,
        periods: u32,
        start_date: NaiveDate,
    ) -> Result<Vec<ScheduledInstallment>> {
        let p = principal.as_decimal();
        let n = Decimal::from(periods);

        let total_interest = match self.interest_type {
            InterestType::Fixed => p * annual_rate.as_decimal(),
            InterestType::Simple | InterestType::Compound => {
                let years = n / Decimal::from(self.frequency.periods_per_year());
                p * annual_rate.as_decimal() * years
            }
        };

        let capital = Money::from_decimal_round_up(p / n);
        let interest = Money::from_decimal_round_up(total_interest / n);

        (1..=periods)
            .map(|i| {
                Ok(ScheduledInstallment {
                    number: i,
                    due_date: add_period(start_date, i, self.frequency)?,
                    amount_capital: capital,
                    amount_interest: interest,
                })
            })
            .collect()
    }
}

/// P * r * (1 + r)^n / ((1 + r)^n - 1)
fn annuity_payment(principal: Decimal, period_rate: Decimal, periods: u32) -> Result<Decimal> {
    let overflow = || LedgerError::CalculationError {
        message: format!(
            "annuity factor overflows for rate {} over {} periods",
            period_rate, periods
        ),
    };

    let base = Decimal::ONE + period_rate;
    let mut compound = Decimal::ONE;
    for _ in 0..periods {
        compound = compound.checked_mul(base).ok_or_else(overflow)?;
    }

    let numerator = principal
        .checked_mul(period_rate)
        .and_then(|v| v.checked_mul(compound))
        .ok_or_else(overflow)?;
    let denominator = compound - Decimal::ONE;

    numerator.checked_div(denominator).ok_or_else(overflow)
}

/// move a date forward by `step` charge periods.
///
/// Months keep the day of month; days past the end of the target month roll
/// into the next one (Jan 31 + 1 month = Mar 2 in a leap year).
pub fn add_period(date: NaiveDate, step: u32, frequency: ChargeFrequency) -> Result<NaiveDate> {
    let shifted = match frequency {
        ChargeFrequency::Daily => date.checked_add_days(Days::new(u64::from(step))),
        ChargeFrequency::Weekly => date.checked_add_days(Days::new(u64::from(step) * 7)),
        ChargeFrequency::Monthly => add_months(date, step),
    };

    shifted.ok_or_else(|| LedgerError::InvalidDate {
        message: format!("{} plus {} {:?} periods is out of range", date, step, frequency),
    })
}

fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total = i64::from(date.year()) * 12 + i64::from(date.month0()) + i64::from(months);
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;

    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(u64::from(date.day0())))
}
