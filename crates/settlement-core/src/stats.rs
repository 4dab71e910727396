use crate::ledger::Ledger;
use crate::transaction::TransactionStatus;
use serde::Serialize;

/// Aggregate counters over the ledger and transaction log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub account_count: usize,
    pub transaction_count: usize,
    pub pending_count: usize,
    /// Transactions with a terminal status, successful or not
    pub settled_count: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
}

impl Stats {
    pub fn collect(ledger: &Ledger) -> Self {
        let transactions = ledger.transactions();

        let mut stats = Self {
            account_count: ledger.account_count(),
            transaction_count: transactions.len(),
            ..Self::default()
        };

        for tx in transactions {
            match tx.status {
                TransactionStatus::Pending => stats.pending_count += 1,
                TransactionStatus::Settled => stats.succeeded_count += 1,
                TransactionStatus::Failed => stats.failed_count += 1,
            }
        }
        stats.settled_count = stats.succeeded_count + stats.failed_count;

        stats
    }
}
