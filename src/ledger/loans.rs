use chrono::NaiveDate;

use crate::decimal::Money;
use crate::errors::Result;
use crate::payments::{
    add_period, build_loan, Allocation, InterestDistributor, InterestPaymentOutcome, LoanBalance,
    LoanTerms, PaymentOutcome, PaymentRequest,
};
use crate::repository::{InstallmentPatch, LedgerRepository, LoanPatch};
use crate::state::{Client, Installment, Loan};
use crate::sync::{SyncOperation, SyncQueue, SyncTable};
use crate::types::{InstallmentId, LoanId, LoanStatus, OwnerId, PaymentTarget};

use super::Ledger;

impl<R: LedgerRepository, Q: SyncQueue> Ledger<R, Q> {
    pub async fn register_client(
        &self,
        owner_id: OwnerId,
        name: impl Into<String>,
        document_id: Option<String>,
        phone: Option<String>,
    ) -> Result<Client> {
        let client = Client::new(owner_id, name.into(), document_id, phone, self.now());
        self.repo.insert_client(client.clone()).await?;
        self.publish(SyncOperation::insert(SyncTable::Clients, &client, self.now()))
            .await;

        tracing::info!(client_id = %client.id, owner_id = %owner_id, "client registered");
        Ok(client)
    }

    /// Create a loan together with its single balloon installment.
    pub async fn create_loan(&self, terms: LoanTerms) -> Result<Loan> {
        let now = self.now();
        let (loan, installments) = build_loan(&terms, now)?;

        self.repo.insert_loan(loan.clone()).await?;
        self.publish(SyncOperation::insert(SyncTable::Loans, &loan, now)).await;
        for installment in installments {
            self.repo.insert_installment(installment.clone()).await?;
            self.publish(SyncOperation::insert(
                SyncTable::LoanInstallments,
                &installment,
                now,
            ))
            .await;
        }

        tracing::info!(
            loan_id = %loan.id,
            client_id = %loan.client_id,
            principal = %loan.principal,
            rate = %loan.interest_rate,
            "loan created"
        );
        Ok(loan)
    }

    pub async fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        self.repo.get_loan(loan_id).await
    }

    pub async fn get_installment(&self, installment_id: InstallmentId) -> Result<Option<Installment>> {
        self.repo.get_installment(installment_id).await
    }

    /// live installments of a loan ordered by number
    pub async fn installments(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        self.repo.get_installments_by_loan(loan_id, false).await
    }

    /// unpaid installments, oldest due first
    pub async fn pending_installments(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        let mut pending: Vec<Installment> = self
            .repo
            .get_installments_by_loan(loan_id, false)
            .await?
            .into_iter()
            .filter(|i| !i.paid)
            .collect();
        pending.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.number.cmp(&b.number)));
        Ok(pending)
    }

    /// interest still owed across the loan
    pub async fn remaining_interest_for_loan(&self, loan_id: LoanId) -> Result<Money> {
        let installments = self.repo.get_installments_by_loan(loan_id, false).await?;
        let scheduled: Money = installments.iter().map(|i| i.amount_interest).sum();
        let paid: Money = installments.iter().map(|i| i.paid_interest_or_zero()).sum();
        Ok(scheduled.saturating_sub(paid))
    }

    pub async fn loan_balance(&self, loan_id: LoanId) -> Result<Option<LoanBalance>> {
        if self.repo.get_loan(loan_id).await?.is_none() {
            return Ok(None);
        }
        let installments = self.repo.get_installments_by_loan(loan_id, false).await?;
        Ok(Some(LoanBalance::from_installments(&installments)))
    }

    /// Apply a payment to one installment.
    ///
    /// Returns `Ok(None)` for a non-positive amount, a missing installment or
    /// an installment that owes nothing.
    pub async fn pay_installment(&self, request: PaymentRequest) -> Result<Option<PaymentOutcome>> {
        if !request.amount.is_positive() {
            tracing::debug!(
                installment_id = %request.installment_id,
                amount = %request.amount,
                "ignoring non-positive payment"
            );
            return Ok(None);
        }

        let Some(installment) = self.repo.get_installment(request.installment_id).await? else {
            tracing::warn!(installment_id = %request.installment_id, "payment for unknown installment");
            return Ok(None);
        };

        let loan_id = installment.loan_id;
        let _guard = self.locks.lock(loan_id).await;

        // re-read now that no other writer can touch the loan
        let Some(installment) = self.repo.get_installment(request.installment_id).await? else {
            return Ok(None);
        };

        let paid_date = request.paid_date.unwrap_or_else(|| self.today());
        let Some((allocation, overflow_installment)) = self
            .apply_payment(&installment, request.amount, paid_date, request.target)
            .await?
        else {
            return Ok(None);
        };

        let loan_closed = self.reconcile_locked(loan_id).await?;

        Ok(Some(PaymentOutcome {
            loan_id,
            allocation,
            overflow_installment,
            loan_closed,
        }))
    }

    /// Spread an interest-only payment over the loan's installments, oldest first.
    pub async fn pay_loan_interest(
        &self,
        loan_id: LoanId,
        amount: Money,
        paid_date: Option<NaiveDate>,
    ) -> Result<Option<InterestPaymentOutcome>> {
        if !amount.is_positive() {
            return Ok(None);
        }

        let _guard = self.locks.lock(loan_id).await;

        let installments = self.repo.get_installments_by_loan(loan_id, false).await?;
        if installments.is_empty() {
            return Ok(None);
        }

        let paid_date = paid_date.unwrap_or_else(|| self.today());
        let plan = InterestDistributor::plan(&installments, amount);

        let mut allocations = Vec::with_capacity(plan.shares.len());
        let mut loan_closed = false;
        for share in &plan.shares {
            let Some(installment) = self.repo.get_installment(share.installment_id).await? else {
                continue;
            };
            if let Some((allocation, _)) = self
                .apply_payment(&installment, share.amount, paid_date, PaymentTarget::Interest)
                .await?
            {
                allocations.push(allocation);
            }
            loan_closed |= self.reconcile_locked(loan_id).await?;
        }

        tracing::info!(
            loan_id = %loan_id,
            amount = %amount,
            installments = allocations.len(),
            unallocated = %plan.unallocated,
            "interest distributed"
        );

        Ok(Some(InterestPaymentOutcome {
            loan_id,
            plan,
            allocations,
            loan_closed,
        }))
    }

    /// Clear every payment recorded on an installment and reopen its loan.
    ///
    /// The loan goes back to ACTIVE even if the rest of its installments would
    /// still cover it, and scheduled amounts shrunk by a split stay shrunk.
    pub async fn undo_installment_payment(&self, installment_id: InstallmentId) -> Result<()> {
        let Some(installment) = self.repo.get_installment(installment_id).await? else {
            return Ok(());
        };

        let loan_id = installment.loan_id;
        let _guard = self.locks.lock(loan_id).await;
        let now = self.now();

        let patch = InstallmentPatch::reset_payment();
        self.repo.update_installment(installment_id, patch.clone()).await?;
        self.publish(SyncOperation::update(
            SyncTable::LoanInstallments,
            installment_id,
            &patch,
            now,
        ))
        .await;

        let reopen = LoanPatch::reopened();
        self.repo.update_loan(loan_id, reopen.clone()).await?;
        self.publish(SyncOperation::update(SyncTable::Loans, loan_id, &reopen, now))
            .await;

        tracing::info!(
            loan_id = %loan_id,
            installment_id = %installment_id,
            number = installment.number,
            "installment payment undone"
        );
        Ok(())
    }

    /// Re-check whether a loan is fully paid and close it if so.
    ///
    /// Returns `true` only when this call closed the loan.
    pub async fn reconcile_loan(&self, loan_id: LoanId) -> Result<bool> {
        let _guard = self.locks.lock(loan_id).await;
        self.reconcile_locked(loan_id).await
    }

    /// soft delete a loan and its installments
    pub async fn delete_loan(&self, loan_id: LoanId) -> Result<()> {
        {
            let _guard = self.locks.lock(loan_id).await;
            if self.repo.get_loan(loan_id).await?.is_none() {
                return Ok(());
            }
            let now = self.now();

            for installment in self.repo.get_installments_by_loan(loan_id, false).await? {
                self.repo
                    .update_installment(installment.id, InstallmentPatch::soft_delete())
                    .await?;
                self.publish(Ok(SyncOperation::soft_delete(
                    SyncTable::LoanInstallments,
                    installment.id,
                    now,
                )))
                .await;
            }

            let patch = LoanPatch {
                deleted: Some(true),
                ..LoanPatch::default()
            };
            self.repo.update_loan(loan_id, patch).await?;
            self.publish(Ok(SyncOperation::soft_delete(SyncTable::Loans, loan_id, now)))
                .await;
        }

        self.locks.forget(loan_id);
        tracing::info!(loan_id = %loan_id, "loan deleted");
        Ok(())
    }

    /// allocate, persist and split if needed; caller holds the loan lock
    async fn apply_payment(
        &self,
        installment: &Installment,
        amount: Money,
        paid_date: NaiveDate,
        target: PaymentTarget,
    ) -> Result<Option<(Allocation, Option<Installment>)>> {
        let loan_id = installment.loan_id;
        let siblings = self.repo.get_installments_by_loan(loan_id, true).await?;
        let last_live = siblings
            .iter()
            .filter(|i| !i.deleted)
            .map(|i| i.number)
            .max()
            .unwrap_or(installment.number);
        let is_last = installment.number >= last_live;

        let Some(allocation) = self.allocator.allocate(installment, amount, target, is_last) else {
            tracing::debug!(
                installment_id = %installment.id,
                "installment owes nothing, payment ignored"
            );
            return Ok(None);
        };

        let now = self.now();
        let patch = allocation.to_patch(paid_date);
        self.repo.update_installment(installment.id, patch.clone()).await?;
        self.publish(SyncOperation::update(
            SyncTable::LoanInstallments,
            installment.id,
            &patch,
            now,
        ))
        .await;

        tracing::debug!(
            loan_id = %loan_id,
            installment_id = %installment.id,
            target = ?target,
            payment = %allocation.payment,
            to_capital = %allocation.to_capital,
            to_interest = %allocation.to_interest,
            fully_paid = allocation.fully_paid,
            "payment allocated"
        );

        if !allocation.is_split() {
            return Ok(Some((allocation, None)));
        }

        let frequency = match self.repo.get_loan(loan_id).await? {
            Some(loan) => loan.charge_frequency,
            None => self.config.fallback_charge_frequency,
        };
        let due_date = add_period(installment.due_date, 1, frequency)?;
        let number = siblings.iter().map(|i| i.number).max().unwrap_or(installment.number) + 1;

        let overflow = allocation.overflow_installment(installment, number, due_date, now);
        if let Some(next) = &overflow {
            self.repo.insert_installment(next.clone()).await?;
            self.publish(SyncOperation::insert(SyncTable::LoanInstallments, next, now))
                .await;

            tracing::info!(
                loan_id = %loan_id,
                installment_id = %installment.id,
                new_installment_id = %next.id,
                number = next.number,
                capital = %next.amount_capital,
                interest = %next.amount_interest,
                due_date = %next.due_date,
                "installment split"
            );
        }

        Ok(Some((allocation, overflow)))
    }

    /// close the loan when its installments cover the schedule; caller holds the loan lock
    async fn reconcile_locked(&self, loan_id: LoanId) -> Result<bool> {
        let mut closed = false;
        let installments = self.repo.get_installments_by_loan(loan_id, false).await?;
        let Some(settlement) = self.reconciler.assess(&installments) else {
            return Ok(false);
        };

        let today = self.today();
        let now = self.now();
        for installment in installments
            .iter()
            .filter(|i| settlement.mark_paid.contains(&i.id))
        {
            let patch = InstallmentPatch {
                paid: Some(true),
                paid_date: Some(Some(installment.paid_date.unwrap_or(today))),
                ..InstallmentPatch::default()
            };
            self.repo.update_installment(installment.id, patch.clone()).await?;
            self.publish(SyncOperation::update(
                SyncTable::LoanInstallments,
                installment.id,
                &patch,
                now,
            ))
            .await;
        }

        if let Some(loan) = self.repo.get_loan(loan_id).await? {
            if loan.status != LoanStatus::Paid {
                let patch = LoanPatch::closed(today);
                self.repo.update_loan(loan_id, patch.clone()).await?;
                self.publish(SyncOperation::update(SyncTable::Loans, loan_id, &patch, now))
                    .await;

                tracing::info!(
                    loan_id = %loan_id,
                    scheduled = %settlement.balance.scheduled,
                    paid = %settlement.balance.paid,
                    "loan closed"
                );
                closed = true;
            }
        }

        Ok(closed)
    }
}
