use crate::error::SettlementError;
use crate::ledger::{Ledger, QueuedTransaction};
use crate::transaction::{TransactionId, TransactionKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of settling one transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementResult {
    pub transaction_id: TransactionId,
    pub success: bool,
    /// New balance on success, untouched balance on failure, absent when
    /// the account does not exist
    pub balance: Option<f64>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<SettlementError>,
    pub processed_at: DateTime<Utc>,
}

impl SettlementResult {
    pub(crate) fn succeeded(transaction_id: TransactionId, balance: f64) -> Self {
        Self {
            transaction_id,
            success: true,
            balance: Some(balance),
            error: None,
            processed_at: Utc::now(),
        }
    }

    pub(crate) fn failed(
        transaction_id: TransactionId,
        balance: Option<f64>,
        error: SettlementError,
    ) -> Self {
        Self {
            transaction_id,
            success: false,
            balance,
            error: Some(error),
            processed_at: Utc::now(),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

fn serialize_error<S>(error: &Option<SettlementError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Applies one queued transaction to the ledger and records the outcome.
/// Must run under the engine's exclusive lock.
pub(crate) fn settle(ledger: &mut Ledger, queued: &QueuedTransaction) -> SettlementResult {
    let tx = &queued.transaction;

    let result = match ledger.account(&tx.user_id).map(|account| account.available) {
        Err(_) => SettlementResult::failed(tx.id, None, SettlementError::AccountNotFound),
        Ok(current) => {
            let applied = match &tx.kind {
                TransactionKind::Credit => ledger.apply_credit(&tx.user_id, tx.amount),
                TransactionKind::Debit => ledger.apply_debit(&tx.user_id, tx.amount),
                TransactionKind::Unrecognized(kind) => {
                    Err(SettlementError::InvalidTransactionKind(kind.clone()))
                }
            };

            match applied {
                Ok(balance) => SettlementResult::succeeded(tx.id, balance),
                Err(err) => SettlementResult::failed(tx.id, Some(current), err),
            }
        }
    };

    ledger.record(queued.position, result.clone());

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Transaction, TransactionRequest, TransactionStatus};

    const EPSILON: f64 = 1e-9;

    fn queue(ledger: &mut Ledger, id: u64, request: TransactionRequest) -> QueuedTransaction {
        let transaction = Transaction::stamp(request, TransactionId(id), Utc::now());
        let position = ledger.append(transaction.clone());
        QueuedTransaction {
            position,
            transaction,
        }
    }

    fn ledger_with(user_id: &str, balance: f64) -> Ledger {
        let mut ledger = Ledger::new();
        ledger.create_account(user_id, balance).unwrap();
        ledger
    }

    #[test]
    fn test_credit_adds_exact_amount() {
        let mut ledger = ledger_with("u1", 1000.0);
        let queued = queue(&mut ledger, 1, TransactionRequest::credit("u1", 0.1));

        let result = settle(&mut ledger, &queued);

        assert!(result.success);
        assert!((result.balance.unwrap() - 1000.1).abs() < EPSILON);
        assert_eq!(result.error, None);
        assert_eq!(ledger.transactions()[0].status, TransactionStatus::Settled);
        assert_eq!(ledger.account("u1").unwrap().version, 2);
    }

    #[test]
    fn test_debit_success() {
        let mut ledger = ledger_with("u1", 1000.0);
        let queued = queue(&mut ledger, 1, TransactionRequest::debit("u1", 100.0));

        let result = settle(&mut ledger, &queued);

        assert!(result.success);
        assert!((result.balance.unwrap() - 900.0).abs() < EPSILON);
    }

    #[test]
    fn test_debit_insufficient_reports_unchanged_balance() {
        let mut ledger = ledger_with("u1", 900.0);
        let queued = queue(&mut ledger, 1, TransactionRequest::debit("u1", 1000.0));

        let result = settle(&mut ledger, &queued);

        assert!(!result.success);
        assert_eq!(result.error, Some(SettlementError::InsufficientBalance));
        assert!((result.balance.unwrap() - 900.0).abs() < EPSILON);
        assert_eq!(result.error_message().as_deref(), Some("insufficient balance"));
        assert_eq!(ledger.transactions()[0].status, TransactionStatus::Failed);

        let account = ledger.account("u1").unwrap();
        assert!((account.available - 900.0).abs() < EPSILON);
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_missing_account_omits_balance() {
        let mut ledger = Ledger::new();
        let queued = queue(&mut ledger, 1, TransactionRequest::credit("ghost", 10.0));

        let result = settle(&mut ledger, &queued);

        assert!(!result.success);
        assert_eq!(result.balance, None);
        assert_eq!(result.error, Some(SettlementError::AccountNotFound));
        assert_eq!(ledger.account_count(), 0);
    }

    #[test]
    fn test_unrecognized_kind_fails_without_mutation() {
        let mut ledger = ledger_with("u1", 50.0);
        let request = TransactionRequest::new("u1", 10.0, TransactionKind::from("refund"));
        let queued = queue(&mut ledger, 1, request);

        let result = settle(&mut ledger, &queued);

        assert_eq!(
            result.error,
            Some(SettlementError::InvalidTransactionKind("refund".to_string()))
        );
        assert!((result.balance.unwrap() - 50.0).abs() < EPSILON);
        assert_eq!(ledger.account("u1").unwrap().version, 1);
        assert_eq!(ledger.result(TransactionId(1)), Some(&result));
    }

    #[test]
    fn test_invalid_amount_fails_without_mutation() {
        let mut ledger = ledger_with("u1", 100.0);
        let queued = queue(&mut ledger, 1, TransactionRequest::debit("u1", -50.0));

        let result = settle(&mut ledger, &queued);

        assert_eq!(result.error, Some(SettlementError::InvalidAmount));
        assert!((result.balance.unwrap() - 100.0).abs() < EPSILON);
        assert_eq!(ledger.transactions()[0].status, TransactionStatus::Failed);
        assert_eq!(ledger.account("u1").unwrap().version, 1);
    }

    #[test]
    fn test_overflowing_credit_keeps_balance_finite() {
        let mut ledger = ledger_with("u1", f64::MAX);
        let queued = queue(&mut ledger, 1, TransactionRequest::credit("u1", f64::MAX));

        let result = settle(&mut ledger, &queued);

        assert_eq!(result.error, Some(SettlementError::BalanceOverflow));
        assert_eq!(result.balance, Some(f64::MAX));
        assert_eq!(ledger.account("u1").unwrap().available, f64::MAX);
    }
}
