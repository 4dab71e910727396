use crate::error::{AccountError, SettlementError};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-user account state.
///
/// `available` and `frozen` never go below zero: every mutation that could
/// overdraw either one is checked first and leaves the account untouched on
/// failure. `version` only counts successful mutations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub user_id: String,
    pub available: f64,
    pub frozen: f64,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub(crate) fn new(user_id: String, initial_balance: f64) -> Self {
        Self {
            user_id,
            available: initial_balance,
            frozen: 0.0,
            version: 1,
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn credit(&mut self, amount: f64) -> Result<f64, SettlementError> {
        let available = self.available + amount;
        if !available.is_finite() {
            return Err(SettlementError::BalanceOverflow);
        }

        self.available = available;
        self.touch();

        Ok(self.available)
    }

    pub(crate) fn debit(&mut self, amount: f64) -> Result<f64, SettlementError> {
        if amount > self.available {
            return Err(SettlementError::InsufficientBalance);
        }

        self.available -= amount;
        self.touch();

        Ok(self.available)
    }

    pub(crate) fn freeze(&mut self, amount: f64) -> Result<(), AccountError> {
        if amount > self.available {
            return Err(AccountError::InsufficientBalance {
                requested: amount,
                available: self.available,
            });
        }

        if !(self.frozen + amount).is_finite() {
            return Err(AccountError::BalanceOverflow);
        }

        self.available -= amount;
        self.frozen += amount;
        self.touch();

        Ok(())
    }

    pub(crate) fn unfreeze(&mut self, amount: f64) -> Result<(), AccountError> {
        if amount > self.frozen {
            return Err(AccountError::InsufficientFrozenFunds {
                requested: amount,
                frozen: self.frozen,
            });
        }

        if !(self.available + amount).is_finite() {
            return Err(AccountError::BalanceOverflow);
        }

        self.frozen -= amount;
        self.available += amount;
        self.touch();

        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
