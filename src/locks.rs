use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::LoanId;

/// One async mutex per loan.
///
/// Every read-then-write sequence over a loan's installments runs while
/// holding that loan's guard, so two payments on the same loan never see
/// each other's half-written state. Different loans never contend.
#[derive(Default)]
pub struct LoanLocks {
    locks: DashMap<LoanId, Arc<Mutex<()>>>,
}

impl LoanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, loan_id: LoanId) -> OwnedMutexGuard<()> {
        // clone out of the map so no shard lock is held across the await
        let lock = self.locks.entry(loan_id).or_default().clone();
        lock.lock_owned().await
    }

    /// drop the entry of a loan nobody is waiting on
    pub fn forget(&self, loan_id: LoanId) {
        self.locks
            .remove_if(&loan_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
