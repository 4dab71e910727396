pub mod account;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
mod processor;
pub mod settlement;
pub mod stats;
pub mod transaction;

pub use account::Account;
pub use config::EngineConfig;
pub use engine::SettlementEngine;
pub use error::{AccountError, ConfigError, LifecycleError, SettlementError, SubmitError};
pub use settlement::SettlementResult;
pub use stats::Stats;
pub use transaction::{
    Transaction, TransactionId, TransactionKind, TransactionRequest, TransactionStatus,
};
