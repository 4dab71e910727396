use clap::Parser;
use settlement_core::config::{DEFAULT_BATCH_SIZE, DEFAULT_QUEUE_CAPACITY};
use settlement_core::EngineConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Trait for reading configuration parameters
pub trait Config {
    fn input_path(&self) -> &Path;
    fn accounts_path(&self) -> Option<&Path>;
    fn engine_config(&self) -> EngineConfig;
}

/// CLI configuration
#[derive(Parser, Debug)]
#[command(
    name = "settlement-engine",
    about = "Batches transactions from CSV through an in-memory settlement engine",
    version
)]
pub struct CliConfig {
    /// Path to the input CSV file containing transactions (type,user,amount,description)
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Path to a CSV file with the accounts to create first (user,balance)
    #[arg(long, value_name = "FILE")]
    accounts: Option<PathBuf>,

    /// Capacity of the bounded settlement queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Number of transactions that triggers an immediate flush
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Maximum wait before a partial batch is flushed, in milliseconds
    #[arg(long, default_value_t = 5000)]
    batch_timeout_ms: u64,
}

impl Config for CliConfig {
    fn input_path(&self) -> &Path {
        &self.input_file
    }

    fn accounts_path(&self) -> Option<&Path> {
        self.accounts.as_deref()
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_queue_capacity(self.queue_capacity)
            .with_batch_size(self.batch_size)
            .with_batch_timeout(Duration::from_millis(self.batch_timeout_ms))
    }
}
