use thiserror::Error;

/// Rejected engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("queue capacity must be greater than zero")]
    ZeroQueueCapacity,
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
    #[error("batch timeout must be greater than zero")]
    ZeroBatchTimeout,
}

/// Failures of synchronous account operations (create, read, freeze, unfreeze)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccountError {
    #[error("account {0} already exists")]
    DuplicateAccount(String),
    #[error("account {0} not found")]
    AccountNotFound(String),
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: f64, available: f64 },
    #[error("insufficient frozen funds: requested {requested}, frozen {frozen}")]
    InsufficientFrozenFunds { requested: f64, frozen: f64 },
    #[error("invalid amount {0}")]
    InvalidAmount(f64),
    #[error("user id must not be empty")]
    InvalidUserId,
    #[error("balance would overflow")]
    BalanceOverflow,
}

/// Admission failures surfaced to the submitter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(&'static str),
    #[error("settlement queue is full")]
    QueueFull,
    #[error("settlement engine is stopped")]
    EngineStopped,
}

/// Per-transaction failures recorded in a settlement result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("account not found")]
    AccountNotFound,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("invalid transaction kind {0:?}")]
    InvalidTransactionKind(String),
    #[error("invalid amount")]
    InvalidAmount,
    #[error("balance would overflow")]
    BalanceOverflow,
}

/// Batch processor lifecycle failures
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("batch processor already started")]
    AlreadyStarted,
    #[error("batch processor is not running")]
    NotRunning,
    #[error("no tokio runtime available to spawn the batch processor")]
    NoRuntime,
    #[error("batch processor task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
