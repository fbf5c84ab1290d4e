mod loans;
mod savings;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::config::LedgerConfig;
use crate::errors::Result;
use crate::locks::LoanLocks;
use crate::payments::{LoanReconciler, PaymentAllocator};
use crate::repository::LedgerRepository;
use crate::sync::{SyncOperation, SyncQueue};

/// Entry point for hosts: reads and writes through a [`LedgerRepository`]
/// and reports every write to a [`SyncQueue`].
pub struct Ledger<R: LedgerRepository, Q: SyncQueue> {
    repo: Arc<R>,
    sync: Arc<Q>,
    time: SafeTimeProvider,
    config: LedgerConfig,
    locks: LoanLocks,
    allocator: PaymentAllocator,
    reconciler: LoanReconciler,
}

impl<R: LedgerRepository, Q: SyncQueue> Ledger<R, Q> {
    pub fn new(
        repo: Arc<R>,
        sync: Arc<Q>,
        time: SafeTimeProvider,
        config: LedgerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            repo,
            sync,
            time,
            allocator: PaymentAllocator::new(config.tolerance),
            reconciler: LoanReconciler::new(config.tolerance),
            config,
            locks: LoanLocks::new(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn sync_queue(&self) -> &Arc<Q> {
        &self.sync
    }

    fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// hand a write to the sync queue; replication problems never fail the ledger
    async fn publish(&self, operation: Result<SyncOperation>) {
        let operation = match operation {
            Ok(op) => op,
            Err(e) => {
                tracing::warn!(error = %e, "could not build sync operation");
                return;
            }
        };

        let (table, action) = (operation.table, operation.action);
        if let Err(e) = self.sync.add_to_queue(operation).await {
            tracing::warn!(?table, ?action, error = %e, "failed to enqueue sync operation");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::sync::{QueuedSync, RecordingTransport};
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;

    pub type TestLedger = Ledger<crate::repository::MemoryRepository, QueuedSync<RecordingTransport>>;

    pub fn ledger_at(y: i32, m: u32, d: u32) -> TestLedger {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
        ));
        let mut config = LedgerConfig::natillera();
        config.sync.auto_flush = false;
        let sync = QueuedSync::new(
            Arc::new(RecordingTransport::new()),
            config.sync.clone(),
            time.clone(),
        );
        Ledger::new(
            Arc::new(crate::repository::MemoryRepository::new(time.clone())),
            Arc::new(sync),
            time,
            config,
        )
        .unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }
}
