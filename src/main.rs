mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{CliConfig, Config};
use serde::{Deserialize, Serialize};
use settlement_core::{Account, SettlementEngine, TransactionRequest};
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Account row to create before processing
#[derive(Debug, Deserialize)]
struct AccountInput {
    user: String,
    balance: f64,
}

/// Account row written to stdout
#[derive(Debug, Serialize)]
struct AccountOutput<'a> {
    user: &'a str,
    available: f64,
    frozen: f64,
    version: u64,
}

impl<'a> From<&'a Account> for AccountOutput<'a> {
    fn from(account: &'a Account) -> Self {
        Self {
            user: &account.user_id,
            available: account.available,
            frozen: account.frozen,
            version: account.version,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CliConfig::parse();

    process_transactions(&config).await?;

    info!("Processing completed successfully");

    Ok(())
}

async fn process_transactions<C: Config>(config: &C) -> Result<()> {
    let engine =
        SettlementEngine::new(config.engine_config()).context("Invalid engine configuration")?;

    if let Some(path) = config.accounts_path() {
        load_accounts(&engine, path)?;
    }

    let mut reader = csv_reader(config.input_path()).context("Failed to open input file")?;

    engine.start().context("Failed to start settlement engine")?;

    let mut submitted = 0;
    let mut skipped = 0;

    for result in reader.deserialize() {
        let request: TransactionRequest = match result {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to parse transaction: {e}");
                skipped += 1;

                continue;
            }
        };

        if let Err(e) = engine.submit(request) {
            warn!("Transaction submission error: {e}");
            skipped += 1;
        } else {
            submitted += 1;
        }
    }

    engine.stop().await.context("Failed to stop settlement engine")?;

    let stats = engine.stats();
    info!("Submitted {submitted} transactions, skipped {skipped} invalid transactions");
    info!(
        accounts = stats.account_count,
        transactions = stats.transaction_count,
        pending = stats.pending_count,
        succeeded = stats.succeeded_count,
        failed = stats.failed_count,
        "Settlement stats"
    );

    let mut accounts = engine.accounts();
    accounts.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::WriterBuilder::new().from_writer(handle);

    for account in &accounts {
        writer
            .serialize(AccountOutput::from(account))
            .context("Failed to serialize account")?;
    }

    writer.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn load_accounts(engine: &SettlementEngine, path: &Path) -> Result<()> {
    let mut reader = csv_reader(path).context("Failed to open accounts file")?;

    for result in reader.deserialize() {
        let input: AccountInput = match result {
            Ok(input) => input,
            Err(e) => {
                warn!("Failed to parse account: {e}");

                continue;
            }
        };

        if let Err(e) = engine.create_account(&input.user, input.balance) {
            warn!("Account creation error: {e}");
        }
    }

    Ok(())
}

fn csv_reader(path: &Path) -> csv::Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
}
