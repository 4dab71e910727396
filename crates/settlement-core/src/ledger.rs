use crate::account::Account;
use crate::error::{AccountError, SettlementError};
use crate::settlement::SettlementResult;
use crate::transaction::{Transaction, TransactionId, TransactionStatus};
use std::collections::HashMap;

/// Transaction handed to the batch processor, with its place in the log
#[derive(Debug, Clone)]
pub(crate) struct QueuedTransaction {
    pub(crate) position: usize,
    pub(crate) transaction: Transaction,
}

/// Accounts, transaction log and settlement results.
///
/// Unsynchronized: the engine keeps it behind its single shared/exclusive lock.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: HashMap<String, Account>,
    log: Vec<Transaction>,
    results: HashMap<TransactionId, SettlementResult>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_account(
        &mut self,
        user_id: &str,
        initial_balance: f64,
    ) -> Result<(), AccountError> {
        if user_id.is_empty() {
            return Err(AccountError::InvalidUserId);
        }

        if !initial_balance.is_finite() || initial_balance < 0.0 {
            return Err(AccountError::InvalidAmount(initial_balance));
        }

        if self.accounts.contains_key(user_id) {
            return Err(AccountError::DuplicateAccount(user_id.to_owned()));
        }

        self.accounts.insert(
            user_id.to_owned(),
            Account::new(user_id.to_owned(), initial_balance),
        );

        Ok(())
    }

    pub fn account(&self, user_id: &str) -> Result<&Account, AccountError> {
        self.accounts
            .get(user_id)
            .ok_or_else(|| AccountError::AccountNotFound(user_id.to_owned()))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Adds `amount` to the available balance, returning the new balance.
    /// Only the batch processor moves available funds.
    pub(crate) fn apply_credit(
        &mut self,
        user_id: &str,
        amount: f64,
    ) -> Result<f64, SettlementError> {
        if validate_amount(amount).is_err() {
            return Err(SettlementError::InvalidAmount);
        }

        self.settling_account(user_id)?.credit(amount)
    }

    /// Removes `amount` from the available balance, returning the new balance
    pub(crate) fn apply_debit(
        &mut self,
        user_id: &str,
        amount: f64,
    ) -> Result<f64, SettlementError> {
        if validate_amount(amount).is_err() {
            return Err(SettlementError::InvalidAmount);
        }

        self.settling_account(user_id)?.debit(amount)
    }

    pub fn freeze(&mut self, user_id: &str, amount: f64) -> Result<(), AccountError> {
        validate_amount(amount)?;
        self.account_mut(user_id)?.freeze(amount)
    }

    pub fn unfreeze(&mut self, user_id: &str, amount: f64) -> Result<(), AccountError> {
        validate_amount(amount)?;
        self.account_mut(user_id)?.unfreeze(amount)
    }

    /// Appends to the log and returns the entry's position
    pub(crate) fn append(&mut self, transaction: Transaction) -> usize {
        self.log.push(transaction);
        self.log.len() - 1
    }

    /// Sets the terminal status of a logged transaction and stores its result.
    /// A transaction that already left `Pending` keeps its first outcome.
    pub(crate) fn record(&mut self, position: usize, result: SettlementResult) {
        let Some(entry) = self.log.get_mut(position) else {
            return;
        };

        if !entry.is_pending() {
            return;
        }

        entry.status = if result.success {
            TransactionStatus::Settled
        } else {
            TransactionStatus::Failed
        };
        self.results.insert(result.transaction_id, result);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    pub fn result(&self, id: TransactionId) -> Option<&SettlementResult> {
        self.results.get(&id)
    }

    fn account_mut(&mut self, user_id: &str) -> Result<&mut Account, AccountError> {
        self.accounts
            .get_mut(user_id)
            .ok_or_else(|| AccountError::AccountNotFound(user_id.to_owned()))
    }

    fn settling_account(&mut self, user_id: &str) -> Result<&mut Account, SettlementError> {
        self.accounts
            .get_mut(user_id)
            .ok_or(SettlementError::AccountNotFound)
    }
}

fn validate_amount(amount: f64) -> Result<(), AccountError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(AccountError::InvalidAmount(amount))
    }
}
