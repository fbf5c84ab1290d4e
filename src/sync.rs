use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::errors::{LedgerError, Result};

/// remote table an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTable {
    Clients,
    Loans,
    LoanInstallments,
    SavingsAccounts,
    SavingsMovements,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncAction {
    Insert,
    Update,
    /// physical removal on the remote; ledger deletes are soft and go out as `Update`
    Delete,
}

/// one replicated write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub table: SyncTable,
    pub action: SyncAction,
    /// full row for inserts, `id` plus changed columns for updates
    pub data: Value,
}

impl SyncOperation {
    pub fn new(table: SyncTable, action: SyncAction, data: Value, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            table,
            action,
            data,
        }
    }

    pub fn insert<T: Serialize>(table: SyncTable, row: &T, now: DateTime<Utc>) -> Result<Self> {
        let data = serde_json::to_value(row).map_err(|e| LedgerError::sync(e.to_string()))?;
        Ok(Self::new(table, SyncAction::Insert, data, now))
    }

    pub fn update<T: Serialize>(
        table: SyncTable,
        id: Uuid,
        patch: &T,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut data = serde_json::to_value(patch).map_err(|e| LedgerError::sync(e.to_string()))?;
        let Some(fields) = data.as_object_mut() else {
            return Err(LedgerError::sync(format!(
                "update payload for {:?} is not an object",
                table
            )));
        };
        fields.insert("id".to_string(), Value::String(id.to_string()));
        Ok(Self::new(table, SyncAction::Update, data, now))
    }

    /// flag a row deleted on the remote without removing it
    pub fn soft_delete(table: SyncTable, id: Uuid, now: DateTime<Utc>) -> Self {
        Self::new(
            table,
            SyncAction::Update,
            serde_json::json!({ "id": id.to_string(), "deleted": true }),
            now,
        )
    }
}

/// status broadcast to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Syncing,
    Synced { successful: usize, failed: usize },
    Error { message: String },
}

/// outcome of one flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub successful: usize,
    pub failed: usize,
    /// offline or another flush was running
    pub skipped: bool,
}

impl SyncReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// snapshot of the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub pending_operations: usize,
    pub online: bool,
    pub syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

pub type ListenerId = u64;
pub type StatusListener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

/// queue of writes waiting to be replicated
#[async_trait]
pub trait SyncQueue: Send + Sync {
    async fn add_to_queue(&self, operation: SyncOperation) -> Result<()>;
    async fn flush(&self) -> Result<SyncReport>;
    fn on_status_change(&self, listener: StatusListener) -> ListenerId;
    /// false when the id was not registered
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// where queued operations are replayed
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// called once per flush before any operation; an error aborts the flush
    async fn begin(&self) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, operation: &SyncOperation) -> Result<()>;
}

/// in-memory [`SyncQueue`] replaying through a [`SyncTransport`]
pub struct QueuedSync<T: SyncTransport> {
    transport: Arc<T>,
    config: SyncConfig,
    queue: Mutex<Vec<SyncOperation>>,
    online: AtomicBool,
    syncing: AtomicBool,
    last_sync: Mutex<Option<DateTime<Utc>>>,
    listeners: DashMap<ListenerId, StatusListener>,
    next_listener: AtomicU64,
    time: SafeTimeProvider,
}

impl<T: SyncTransport> QueuedSync<T> {
    /// `last_sync` is read from `time`
    pub fn new(transport: Arc<T>, config: SyncConfig, time: SafeTimeProvider) -> Self {
        Self {
            transport,
            config,
            queue: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
            syncing: AtomicBool::new(false),
            last_sync: Mutex::new(None),
            listeners: DashMap::new(),
            next_listener: AtomicU64::new(1),
            time,
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// going online replays whatever is pending
    pub async fn set_online(&self, online: bool) -> Result<SyncReport> {
        self.online.store(online, Ordering::SeqCst);
        tracing::info!(online, "sync connectivity changed");
        if online {
            self.flush().await
        } else {
            Ok(SyncReport::skipped())
        }
    }

    pub async fn pending(&self) -> Vec<SyncOperation> {
        self.queue.lock().await.clone()
    }

    pub async fn clear_queue(&self) {
        self.queue.lock().await.clear();
    }

    pub async fn state(&self) -> SyncState {
        SyncState {
            pending_operations: self.queue.lock().await.len(),
            online: self.is_online(),
            syncing: self.syncing.load(Ordering::SeqCst),
            last_sync: *self.last_sync.lock().await,
        }
    }

    fn notify(&self, status: SyncStatus) {
        let listeners: Vec<StatusListener> =
            self.listeners.iter().map(|entry| entry.value().clone()).collect();
        for listener in listeners {
            listener(&status);
        }
    }

    async fn replay(&self) -> Result<SyncReport> {
        let batch = self.queue.lock().await.clone();
        if batch.is_empty() {
            return Ok(SyncReport::default());
        }

        self.transport.begin().await?;

        let mut done = Vec::with_capacity(batch.len());
        let mut failed = 0;
        for operation in &batch {
            match self.transport.execute(operation).await {
                Ok(()) => done.push(operation.id),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        operation_id = %operation.id,
                        table = ?operation.table,
                        error = %e,
                        "sync operation failed, keeping it queued"
                    );
                }
            }
        }

        self.queue.lock().await.retain(|op| !done.contains(&op.id));
        *self.last_sync.lock().await = Some(self.time.now());

        Ok(SyncReport {
            successful: done.len(),
            failed,
            skipped: false,
        })
    }
}

#[async_trait]
impl<T: SyncTransport> SyncQueue for QueuedSync<T> {
    async fn add_to_queue(&self, operation: SyncOperation) -> Result<()> {
        tracing::debug!(
            operation_id = %operation.id,
            table = ?operation.table,
            action = ?operation.action,
            "queued sync operation"
        );
        self.queue.lock().await.push(operation);

        if self.config.auto_flush && self.is_online() {
            // a failed flush leaves the operation queued and is reported to listeners
            if let Err(e) = self.flush().await {
                tracing::debug!(error = %e, "auto flush failed");
            }
        }
        Ok(())
    }

    async fn flush(&self) -> Result<SyncReport> {
        if !self.is_online() {
            return Ok(SyncReport::skipped());
        }
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(SyncReport::skipped());
        }

        if self.queue.lock().await.is_empty() {
            self.syncing.store(false, Ordering::SeqCst);
            return Ok(SyncReport::default());
        }

        self.notify(SyncStatus::Syncing);
        let outcome = self.replay().await;
        self.syncing.store(false, Ordering::SeqCst);

        match outcome {
            Ok(report) => {
                tracing::info!(
                    successful = report.successful,
                    failed = report.failed,
                    "sync flush finished"
                );
                self.notify(SyncStatus::Synced {
                    successful: report.successful,
                    failed: report.failed,
                });
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sync flush aborted");
                self.notify(SyncStatus::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn on_status_change(&self, listener: StatusListener) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }
}

/// transport that keeps what it was given; for tests, demos and offline hosts
#[derive(Default)]
pub struct RecordingTransport {
    executed: std::sync::Mutex<Vec<SyncOperation>>,
    failing_tables: DashMap<SyncTable, ()>,
    unreachable: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// reject every operation for `table` until cleared
    pub fn fail_table(&self, table: SyncTable, fail: bool) {
        if fail {
            self.failing_tables.insert(table, ());
        } else {
            self.failing_tables.remove(&table);
        }
    }

    /// make `begin` fail, aborting whole flushes
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn executed(&self) -> Vec<SyncOperation> {
        match self.executed.lock() {
            Ok(ops) => ops.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl SyncTransport for RecordingTransport {
    async fn begin(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(LedgerError::sync("remote unreachable"));
        }
        Ok(())
    }

    async fn execute(&self, operation: &SyncOperation) -> Result<()> {
        if self.failing_tables.contains_key(&operation.table) {
            return Err(LedgerError::sync(format!(
                "rejected {:?} on {:?}",
                operation.action, operation.table
            )));
        }
        let mut executed = self
            .executed
            .lock()
            .map_err(|_| LedgerError::sync("recording transport poisoned"))?;
        executed.push(operation.clone());
        Ok(())
    }
}
