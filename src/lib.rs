pub mod config;
pub mod decimal;
pub mod errors;
pub mod ledger;
pub mod locks;
pub mod payments;
pub mod repository;
pub mod savings;
pub mod state;
pub mod sync;
pub mod types;

// re-export key types
pub use config::{LedgerConfig, SavingsConfig, SyncConfig};
pub use decimal::{format_currency, format_currency_input, parse_currency_input, Money, Rate};
pub use errors::{LedgerError, Result};
pub use ledger::Ledger;
pub use locks::LoanLocks;
pub use payments::{
    add_period, build_loan, AmortizationCalculator, AmortizationSchedule, Allocation,
    DistributionPlan, InterestDistributor, InterestPaymentOutcome, InterestShare, LoanBalance,
    LoanReconciler, LoanTerms, OverflowRemainder, PaymentAllocator, PaymentOutcome,
    PaymentRequest, ScheduledInstallment, Settlement,
};
pub use repository::{
    InstallmentPatch, LedgerRepository, LoanPatch, MemoryRepository, SavingsAccountPatch,
    SavingsMovementPatch,
};
pub use savings::{InterestMode, LiquidationCalculator, LiquidationResult, SavingsSummary};
pub use state::{Client, Installment, Loan, SavingsAccount, SavingsMovement};
pub use sync::{
    ListenerId, QueuedSync, RecordingTransport, StatusListener, SyncAction, SyncOperation,
    SyncQueue, SyncReport, SyncState, SyncStatus, SyncTable, SyncTransport,
};
pub use types::{
    ChargeFrequency, ClientId, InstallmentId, InterestBasis, InterestType, LoanId, LoanStatus,
    MovementId, MovementType, OwnerId, PaymentTarget, SavingsAccountId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
